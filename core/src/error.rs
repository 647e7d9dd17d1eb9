//! Error Types
//!
//! Every fallible operation in the core returns one of these enums. None of
//! them is allowed to take down the hosting process: transport failures are
//! absorbed by the session's reconnect loop, history failures are swallowed
//! by [`crate::history::HistoryClient::load`], and send failures become
//! user-visible notices in [`crate::chat::ChatController`].

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by a [`crate::session::StreamingSession`] handle
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The connection is not open, so the message was dropped
    #[error("not ready yet: connection is {state}")]
    NotReady {
        /// State observed by the driver when the send was attempted
        state: crate::session::ConnectionState,
    },

    /// The session was closed and its driver has exited
    #[error("session closed")]
    Closed,
}

/// Errors produced while establishing or using a transport connection
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint could not be parsed or uses an unsupported scheme
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        /// The endpoint as configured
        endpoint: String,
        /// Why it was rejected
        reason: String,
    },

    /// Handshake with the remote failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Handshake did not finish in time
    #[error("connection timed out after {0} ms")]
    Timeout(u64),

    /// The connection is gone
    #[error("connection closed")]
    ConnectionClosed,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::ConnectionFailed(err.to_string())
    }
}

/// Errors from fetching conversation history
#[derive(Debug, Error)]
pub enum HistoryError {
    /// HTTP request failed before a response arrived
    #[error("history request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("history endpoint returned {0}")]
    Status(reqwest::StatusCode),

    /// Body was not valid JSON
    #[error("history body is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Body was JSON but not an array of messages
    #[error("unexpected history shape: {0}")]
    Shape(String),
}

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ConnectionState;

    #[test]
    fn test_not_ready_mentions_state() {
        let err = SessionError::NotReady {
            state: ConnectionState::Connecting,
        };
        assert!(err.to_string().contains("not ready yet"));
        assert!(err.to_string().contains("connecting"));
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::InvalidEndpoint {
            endpoint: "http://x".into(),
            reason: "scheme must be ws or wss".into(),
        };
        assert!(err.to_string().contains("http://x"));
        assert!(TransportError::Timeout(250).to_string().contains("250"));
    }
}
