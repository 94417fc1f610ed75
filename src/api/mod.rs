//! HTTP API for game clients and operations tooling

pub mod error;
pub mod payloads;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::create_router;
pub use server::HttpServer;
