//! Error types for health snapshot aggregation
//!
//! Only session-level failures surface as [`SnapshotError`]. Per-field problems
//! (missing data, implausible values) are reported as diagnostics on a
//! successful [`crate::reconcile::SnapshotReport`].

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that abort an aggregation
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Biometric provider is not supported on this platform")]
    ProviderUnsupportedPlatform,

    #[error("Provider session setup failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid query window: start {start} is not before end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a single provider call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("Provider SDK error: {0}")]
    Sdk(String),

    #[error("Provider reported {0} as unsuccessful")]
    Unsuccessful(&'static str),

    #[error("Provider callback was dropped without a result")]
    CallbackDropped,

    #[error("Failed to decode provider payload: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        ProviderError::Decode(e.to_string())
    }
}
