//! Configuration management for the helper.

use std::env;
use std::path::PathBuf;

/// Helper configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Inline device list, `id|name|url` entries separated by `;` or `,`
    pub devices: Option<String>,
    /// JSON device file, resolved against the working directory
    pub devices_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
            devices: None,
            devices_file: PathBuf::from("devices.json"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = env::var("HOST").unwrap_or(defaults.host);

        let port = match env::var("PORT") {
            Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => defaults.port,
        };

        let devices = env::var("DLNA_DEVICES")
            .ok()
            .filter(|source| !source.trim().is_empty());

        let devices_file = env::var("DLNA_DEVICES_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.devices_file);

        Ok(Self {
            host,
            port,
            devices,
            devices_file,
        })
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value: {0:?}")]
    InvalidPort(String),
}
