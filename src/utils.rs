//! Utility functions for the matchmaking service

use crate::error::{MatchmakingError, Result};
use crate::types::PlayerId;
use chrono::{DateTime, Utc};

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Unwrap an optional player id from a request, rejecting absent or zero ids
pub fn require_player_id(player_id: Option<PlayerId>, field: &str) -> Result<PlayerId> {
    match player_id {
        None => Err(MatchmakingError::missing(field).into()),
        Some(id) => validate_player_id(id),
    }
}

/// Zero is reserved for "no opponent" by older clients
pub fn validate_player_id(player_id: PlayerId) -> Result<PlayerId> {
    if player_id == 0 {
        return Err(MatchmakingError::InvalidPlayerId { player_id }.into());
    }
    Ok(player_id)
}
