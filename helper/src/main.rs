//! Inventory Helper binary.

use inventory_helper::config::Config;
use inventory_helper::{app, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inventory_helper=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    let addr = config.bind_addr();

    let state = AppState::from_config(config);
    if state.devices.is_empty() {
        tracing::warn!("No devices defined. Set DLNA_DEVICES or create the device file.");
    } else {
        for device in state.devices.all() {
            tracing::info!("Device {}: {} ({})", device.id, device.name, device.play_url);
        }
    }

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Helper listening on http://{}", addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
