//! Agent error types.

use thiserror::Error;

/// Agent error type.
#[derive(Error, Debug)]
pub enum AgentError {
    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The server rejected the connection with a credential-related status
    #[error("connection rejected: invalid agent token")]
    Unauthorized,

    /// Handshake did not complete with a welcome
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// JSON serialization error on an outbound frame
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The connection dropped while a send was pending
    #[error("connection closed")]
    ConnectionClosed,
}

/// Result type alias using AgentError.
pub type AgentResult<T> = Result<T, AgentError>;
