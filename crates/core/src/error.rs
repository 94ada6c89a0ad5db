//! Error types for the flowphase system.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the flowphase system.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (invalid or missing data).
    #[error("Data error: {0}")]
    Data(String),

    /// Upstream fetch error.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }
}

/// Failure reported by a data provider.
///
/// An empty series is not an error: providers return `Ok` with no points
/// when the upstream has nothing for the request.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchError {
    /// The upstream does not serve this symbol or series.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// A transient failure (transport, non-success status, bad payload).
    #[error("transient failure: {0}")]
    Transient(String),

    /// The fetch did not complete within the configured limit.
    #[error("timed out after {0} ms")]
    Timeout(u64),
}

impl FetchError {
    /// Create an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        FetchError::Unavailable(msg.into())
    }

    /// Create a transient error.
    pub fn transient(msg: impl Into<String>) -> Self {
        FetchError::Transient(msg.into())
    }
}
