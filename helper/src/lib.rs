//! Inventory Helper - device registry and playback queue.
//!
//! A small HTTP service the inventory table calls to list playback devices
//! and hand them media targets. The router is built here so it can be
//! driven in-process by tests; `main.rs` only wires config, logging and the
//! listener.

pub mod config;
pub mod devices;
pub mod error;
pub mod playback;
pub mod routes;

use crate::config::Config;
use crate::devices::DeviceRegistry;
use crate::playback::PlaybackQueue;
use axum::http::{header, Method};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub devices: Arc<DeviceRegistry>,
    pub playback: Arc<PlaybackQueue>,
}

impl AppState {
    /// Build state, loading the device registry from the configured sources.
    pub fn from_config(config: Config) -> Self {
        let devices = DeviceRegistry::load(config.devices.as_deref(), &config.devices_file);
        Self::new(config, devices)
    }

    pub fn new(config: Config, devices: DeviceRegistry) -> Self {
        Self {
            config: Arc::new(config),
            devices: Arc::new(devices),
            playback: PlaybackQueue::new_shared(),
        }
    }
}

/// Build the application router with tracing and CORS layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .with_state(state)
}
