//! Error types for the matchmaking service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

use crate::types::PlayerId;

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: PlayerId },

    #[error("Waiting pool is empty")]
    PoolEmpty,

    #[error("Player {player_id} is not in the waiting pool")]
    NotInPool { player_id: PlayerId },

    #[error("Missing required field: {field}")]
    MissingRequiredField { field: String },

    #[error("Invalid player id: {player_id}")]
    InvalidPlayerId { player_id: PlayerId },

    #[error("Round content generation failed: {reason}")]
    ContentGenerationFailed { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl MatchmakingError {
    /// Shorthand for a missing request field
    pub fn missing(field: &str) -> Self {
        MatchmakingError::MissingRequiredField {
            field: field.to_string(),
        }
    }

    /// Error raised when a lock guarding shared state was poisoned
    pub fn lock_poisoned(what: &str) -> Self {
        MatchmakingError::InternalError {
            message: format!("Failed to acquire {} lock", what),
        }
    }
}

/// Find the matchmaking error carried by an anyhow error, if any
pub fn as_matchmaking_error(error: &anyhow::Error) -> Option<&MatchmakingError> {
    error.downcast_ref::<MatchmakingError>()
}
