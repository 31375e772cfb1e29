//! Error taxonomy for the detection core
//!
//! None of these are fatal to the process: adapter errors skip a
//! resource or phase, persistence errors drop a finding from the
//! alerting path, and notification errors never affect persisted state.

use thiserror::Error;

/// Metric source failures
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("metric source unavailable: {0}")]
    Unavailable(String),
    #[error("malformed metric response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AdapterError::Malformed(err.to_string())
        } else {
            AdapterError::Unavailable(err.to_string())
        }
    }
}

/// Finding store failures
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("finding store connection unavailable: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("finding store query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("finding payload could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Notification channel failures
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("notification endpoint rejected the alert: status {status}")]
    Rejected { status: u16 },
}
