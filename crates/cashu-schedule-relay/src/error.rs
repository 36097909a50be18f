//! Error types for the relay module.

use thiserror::Error;

/// Errors that can occur while talking to relays.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Endpoint is not a usable WebSocket URL.
    #[error("invalid relay url: {0}")]
    InvalidUrl(String),

    /// Could not reach the relay.
    #[error("connection to {url} failed: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// Transport-level error after connecting.
    #[error("transport error: {0}")]
    TransportError(String),

    /// Relay sent something that is not a NIP-01 message.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// No acknowledgement in time.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::SerializationError(err.to_string())
    }
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
