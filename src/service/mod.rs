//! Service layer for the flag-duel matchmaking service
//!
//! This module contains the main application state, health reporting and
//! background task management for the production service.

pub mod app;
pub mod health;

pub use app::{AppState, ServiceError};
pub use health::{ComponentCheck, HealthCheck, HealthStatus, ServiceStats};
