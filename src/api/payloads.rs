//! JSON request and response bodies
//!
//! Field names follow the game client (`playerID`, `opponentID`,
//! `gameFinished`), so they differ from the Rust-side names.

use crate::api::error::ApiError;
use crate::types::{JoinOutcome, MatchStatus, OpponentView, PlayerId};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Body naming a player, used by join, status, leave and finish
#[derive(Debug, Default, Deserialize)]
pub struct PlayerRequest {
    #[serde(rename = "playerID", default, deserialize_with = "optional_player_id")]
    pub player_id: Option<PlayerId>,
}

/// Body of a score report; `score` may be omitted to only poll the opponent
#[derive(Debug, Default, Deserialize)]
pub struct ScoreRequest {
    #[serde(default, deserialize_with = "optional_player_id")]
    pub id: Option<PlayerId>,
    #[serde(default)]
    pub score: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinResponse {
    pub started_matchmaking: bool,
    pub paired: bool,
    #[serde(rename = "playerID")]
    pub player_id: PlayerId,
    #[serde(rename = "opponentID")]
    pub opponent_id: Option<PlayerId>,
}

impl From<JoinOutcome> for JoinResponse {
    fn from(outcome: JoinOutcome) -> Self {
        Self {
            started_matchmaking: outcome.paired,
            paired: outcome.paired,
            player_id: outcome.player_id,
            opponent_id: outcome.opponent_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub started_matchmaking: bool,
    pub paired: bool,
    #[serde(rename = "opponentID")]
    pub opponent_id: Option<PlayerId>,
}

impl From<MatchStatus> for StatusResponse {
    fn from(status: MatchStatus) -> Self {
        Self {
            started_matchmaking: status.paired,
            paired: status.paired,
            opponent_id: status.opponent_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub score: i64,
    #[serde(rename = "gameFinished")]
    pub game_finished: bool,
    #[serde(rename = "opponentID")]
    pub opponent_id: PlayerId,
}

impl From<OpponentView> for ScoreResponse {
    fn from(view: OpponentView) -> Self {
        Self {
            score: view.score,
            game_finished: view.finished,
            opponent_id: view.opponent_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoundResponse {
    pub final_flags: Vec<String>,
    pub round_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    pub gversion: String,
    pub server_version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub server_online: bool,
}

/// Parse a JSON body; an empty body yields the default request
pub fn parse_body<T>(body: &[u8]) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}

/// Older clients send ids as floats (`3.0`); accept any whole, non-negative number
fn optional_player_id<'de, D>(deserializer: D) -> Result<Option<PlayerId>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(u64),
        Float(f64),
    }

    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Int(id)) => Ok(Some(id)),
        Some(RawId::Float(value))
            if value.fract() == 0.0 && value >= 0.0 && value < u64::MAX as f64 =>
        {
            Ok(Some(value as u64))
        }
        Some(RawId::Float(value)) => Err(D::Error::custom(format!(
            "player id must be a whole non-negative number, got {}",
            value
        ))),
    }
}
