//! Playback request routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::playback::PlaybackRequest;
use crate::AppState;

/// Create playback routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/play", get(play_handler))
        .route("/playback", get(list_playback))
}

/// Query parameters for GET /play.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayQuery {
    pub device_id: Option<String>,
    pub target: Option<String>,
    pub name: Option<String>,
}

/// Accepted playback response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayResponse {
    pub ok: bool,
    pub device: String,
    pub queued: String,
    pub request_id: String,
}

/// GET /play - Queue a target for a device.
async fn play_handler(
    State(state): State<AppState>,
    Query(query): Query<PlayQuery>,
) -> Result<(StatusCode, Json<PlayResponse>)> {
    let present = |value: Option<String>| value.filter(|v| !v.is_empty());
    let (Some(target), Some(device_id)) = (present(query.target), present(query.device_id)) else {
        return Err(AppError::BadRequest(
            "Missing deviceId or target parameter".to_string(),
        ));
    };

    let device = state
        .devices
        .get(&device_id)
        .ok_or_else(|| AppError::NotFound("Device not found".to_string()))?;

    let name = present(query.name).unwrap_or_else(|| target.clone());
    let request = state.playback.enqueue(&device.id, &name, &target);

    tracing::info!(
        request_id = %request.id,
        device = %device.name,
        play_url = %device.play_url,
        target = %target,
        "Playback requested: {}",
        name
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(PlayResponse {
            ok: true,
            device: device.id.clone(),
            queued: name,
            request_id: request.id,
        }),
    ))
}

/// GET /playback - Queued requests, oldest first.
async fn list_playback(State(state): State<AppState>) -> Json<Vec<PlaybackRequest>> {
    Json(state.playback.list())
}
