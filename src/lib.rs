//! Flag Duel - matchmaking and score relay for two-player flag rounds
//!
//! Players join a first-come-first-served waiting pool, get paired with the
//! next joiner, receive a shared batch of flag tokens, and see each other's
//! score and finished flag through the match record store.

pub mod api;
pub mod config;
pub mod error;
pub mod matchmaking;
pub mod metrics;
pub mod round;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use matchmaking::{MatchmakingCoordinator, ScoreMediator, WaitingPool};
pub use round::{RoundContentGenerator, Vocabulary};
pub use store::{InMemoryMatchStore, JsonFileMatchStore, MatchRecordStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
