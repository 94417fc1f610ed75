//! Common types used throughout the matchmaking service

use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable integer identifier of a player
pub type PlayerId = u64;

/// Unique identifier for a generated round
pub type RoundId = Uuid;

/// Per-player match state kept by the record store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub player_id: PlayerId,
    pub score: i64,
    /// Absent while the player is still waiting for an opponent
    pub opponent_id: Option<PlayerId>,
    pub finished: bool,
    pub updated_at: DateTime<Utc>,
}

impl MatchRecord {
    /// A fresh, unpaired record for a new matchmaking cycle
    pub fn fresh(player_id: PlayerId) -> Self {
        Self {
            player_id,
            score: 0,
            opponent_id: None,
            finished: false,
            updated_at: current_timestamp(),
        }
    }

    pub fn is_paired(&self) -> bool {
        self.opponent_id.is_some()
    }

    /// Where this player sits in the matchmaking state machine
    pub fn phase(&self, in_pool: bool) -> PlayerPhase {
        if self.finished {
            PlayerPhase::Finished
        } else if self.opponent_id.is_some() {
            PlayerPhase::Matched
        } else if in_pool {
            PlayerPhase::Waiting
        } else {
            PlayerPhase::Idle
        }
    }
}

/// Matchmaking lifecycle of a single player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerPhase {
    Unregistered,
    Waiting,
    Matched,
    Finished,
    /// Has a record but neither waits nor has an opponent (left the queue)
    Idle,
}

/// Result of a join request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOutcome {
    pub paired: bool,
    pub player_id: PlayerId,
    pub opponent_id: Option<PlayerId>,
}

impl JoinOutcome {
    pub fn waiting(player_id: PlayerId) -> Self {
        Self {
            paired: false,
            player_id,
            opponent_id: None,
        }
    }

    pub fn paired(player_id: PlayerId, opponent_id: PlayerId) -> Self {
        Self {
            paired: true,
            player_id,
            opponent_id: Some(opponent_id),
        }
    }
}

/// Result of a status poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStatus {
    pub paired: bool,
    pub opponent_id: Option<PlayerId>,
}

/// What a player can see of their opponent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpponentView {
    pub opponent_id: PlayerId,
    pub score: i64,
    pub finished: bool,
}

/// The shared batch of tokens for the current round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundContent {
    pub round_id: RoundId,
    pub tokens: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl RoundContent {
    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            round_id: Uuid::new_v4(),
            tokens,
            generated_at: current_timestamp(),
        }
    }
}

/// How `status` decides whether a player has been paired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusMode {
    /// Paired iff the player's own record names an opponent
    #[default]
    OwnRecord,
    /// Paired iff the waiting pool is currently empty
    PoolProxy,
}

impl std::fmt::Display for StatusMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusMode::OwnRecord => write!(f, "own_record"),
            StatusMode::PoolProxy => write!(f, "pool_proxy"),
        }
    }
}

impl std::str::FromStr for StatusMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "own_record" | "own-record" => Ok(StatusMode::OwnRecord),
            "pool_proxy" | "pool-proxy" => Ok(StatusMode::PoolProxy),
            other => Err(format!("unknown status mode: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_record_defaults() {
        let record = MatchRecord::fresh(4);
        assert_eq!(record.player_id, 4);
        assert_eq!(record.score, 0);
        assert!(!record.is_paired());
        assert!(!record.finished);
    }

    #[test]
    fn test_phase_transitions() {
        let mut record = MatchRecord::fresh(1);
        assert_eq!(record.phase(true), PlayerPhase::Waiting);
        assert_eq!(record.phase(false), PlayerPhase::Idle);

        record.opponent_id = Some(2);
        assert_eq!(record.phase(false), PlayerPhase::Matched);

        record.finished = true;
        assert_eq!(record.phase(false), PlayerPhase::Finished);
    }

    #[test]
    fn test_status_mode_parsing() {
        assert_eq!("pool_proxy".parse::<StatusMode>(), Ok(StatusMode::PoolProxy));
        assert_eq!("OWN-RECORD".parse::<StatusMode>(), Ok(StatusMode::OwnRecord));
        assert!("sometimes".parse::<StatusMode>().is_err());
        assert_eq!(StatusMode::default(), StatusMode::OwnRecord);
    }
}
