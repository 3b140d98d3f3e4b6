//! Error types for gateway operations.

use quaydb_sync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur while talking to the remote endpoint.
///
/// Every gateway operation returns one of these rather than throwing;
/// transport-level exceptions are converted at the boundary so callers
/// never need exception handling. The gateway never retries on its
/// own; retry policy belongs to the caller.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The remote has no entry for the requested key or pointer.
    #[error("not found: {0}")]
    NotFound(String),

    /// Non-success status or a network-level failure.
    #[error("transport failure: {message}")]
    Transport {
        /// HTTP status, when the failure had one.
        status: Option<u16>,
        /// Error description.
        message: String,
    },

    /// The remote replied with something the protocol does not allow.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl GatewayError {
    /// Creates a transport error from a network-level exception.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a transport error carrying a status code.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: format!("status {status}: {}", message.into()),
        }
    }

    /// Returns true if the remote simply had no entry.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }
}

impl From<ProtocolError> for GatewayError {
    fn from(e: ProtocolError) -> Self {
        GatewayError::Protocol(e.to_string())
    }
}
