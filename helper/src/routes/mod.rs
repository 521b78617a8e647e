//! HTTP route definitions.

mod devices;
mod health;
mod play;

use crate::error::AppError;
use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(devices::routes())
        .merge(play::routes())
        .fallback(not_found)
}

/// Fallback for unknown paths.
async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
