//! Local API error types.

use thiserror::Error;

/// Error type for local API calls.
#[derive(Error, Debug)]
pub enum HaError {
    /// Non-2xx status from the local API
    #[error("HA returned {0}")]
    Status(u16),

    /// Transport-level HTTP error (connect, timeout, body)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias using HaError.
pub type HaResult<T> = Result<T, HaError>;
