//! HTTP routes for the game client and for operations tooling

use crate::api::error::ApiError;
use crate::api::payloads::{
    parse_body, JoinResponse, MessageResponse, PingResponse, PlayerRequest, RoundResponse,
    ScoreRequest, ScoreResponse, StatusResponse, VersionResponse,
};
use crate::error::MatchmakingError;
use crate::service::app::AppState;
use crate::service::health::{HealthCheck, HealthStatus};
use crate::utils::require_player_id;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put, MethodRouter},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

type SharedState = Arc<AppState>;

/// Build the router serving every endpoint
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/matchmaking",
            put(join_matchmaking)
                .post(matchmaking_status)
                .patch(leave_matchmaking),
        )
        .route("/communication", communication_routes())
        // Path used by released game clients
        .route("/communicationAPI", communication_routes())
        .route("/update", get(server_version))
        .route("/ping", get(ping))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

fn communication_routes() -> MethodRouter<SharedState> {
    get(round_content).patch(report_score).post(mark_finished)
}

async fn join_matchmaking(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<JoinResponse>, ApiError> {
    let request: PlayerRequest = parse_body(&body)?;
    let coordinator = state.coordinator();

    let outcome = match request.player_id {
        Some(player_id) => coordinator.join(player_id).await?,
        None if state.config().matchmaking.assign_player_ids => coordinator.join_new().await?,
        None => return Err(MatchmakingError::missing("playerID").into()),
    };

    Ok(Json(outcome.into()))
}

async fn matchmaking_status(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<StatusResponse>, ApiError> {
    let request: PlayerRequest = parse_body(&body)?;
    let player_id = require_player_id(request.player_id, "playerID")?;

    let status = state.coordinator().status(player_id).await?;
    Ok(Json(status.into()))
}

async fn leave_matchmaking(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let request: PlayerRequest = parse_body(&body)?;
    let player_id = require_player_id(request.player_id, "playerID")?;

    state.coordinator().leave(player_id).await?;
    Ok(Json(MessageResponse::new(
        "Successfully removed player from queue",
    )))
}

async fn round_content(State(state): State<SharedState>) -> Result<Json<RoundResponse>, ApiError> {
    let response = match state.coordinator().round_content()? {
        Some(content) => RoundResponse {
            final_flags: content.tokens.clone(),
            round_id: Some(content.round_id),
        },
        None => RoundResponse {
            final_flags: Vec::new(),
            round_id: None,
        },
    };

    Ok(Json(response))
}

async fn report_score(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: ScoreRequest = parse_body(&body)?;
    let player_id = require_player_id(request.id, "id")?;

    match state.mediator().report_score(player_id, request.score).await? {
        Some(view) => Ok(Json(ScoreResponse::from(view)).into_response()),
        None => Ok((
            StatusCode::ACCEPTED,
            Json(MessageResponse::new("No opponent yet, try again later")),
        )
            .into_response()),
    }
}

async fn mark_finished(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let request: PlayerRequest = parse_body(&body)?;
    let player_id = require_player_id(request.player_id, "playerID")?;

    state.mediator().finish(player_id).await?;
    Ok(Json(MessageResponse::new("State successfully set")))
}

async fn server_version(State(state): State<SharedState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        gversion: state.config().service.game_version.clone(),
        server_version: crate::VERSION.to_string(),
    })
}

async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        server_online: true,
    })
}

async fn health(State(state): State<SharedState>) -> Response {
    debug!("Health check requested");

    match HealthCheck::check(state.clone()).await {
        Ok(health) => {
            state
                .metrics_collector()
                .update_health_status(health.status.as_gauge());
            let status = match health.status {
                HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::OK,
            };
            (status, Json(health)).into_response()
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": state.config().service.name,
                    "error": e.to_string()
                })),
            )
                .into_response()
        }
    }
}

async fn metrics(State(state): State<SharedState>) -> Response {
    debug!("Metrics endpoint requested");

    let collector = state.metrics_collector();
    match state.coordinator().get_stats().await {
        Ok(stats) => collector.update_from_stats(&stats),
        Err(e) => debug!("Serving metrics without fresh stats: {}", e),
    }

    let metric_families = collector.registry().gather();
    let encoder = TextEncoder::new();

    match encoder.encode_to_string(&metric_families) {
        Ok(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            output,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics".to_string(),
            )
                .into_response()
        }
    }
}
