//! Device listing.

use axum::{extract::State, routing::get, Json, Router};

use crate::devices::Device;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/devices", get(list_devices))
}

/// GET /devices
async fn list_devices(State(state): State<AppState>) -> Json<Vec<Device>> {
    Json(state.devices.all().to_vec())
}
