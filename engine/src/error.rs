//! Error types for the inventory engine.
//!
//! None of these reach the caller of a store mutator. They surface only at
//! the seams that can genuinely fail: the durable storage backend, the
//! snapshot codec and the CSV writer.

use thiserror::Error;

/// All possible errors from the inventory engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Durable storage
    #[error("storage unavailable: {0}")]
    Storage(String),

    // Persisted state
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    // Export
    #[error("csv export failed: {0}")]
    Export(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Export(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
