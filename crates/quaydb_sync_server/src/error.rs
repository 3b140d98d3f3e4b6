//! Error types for the sync server.

use quaydb_store::StoreError;
use quaydb_sync_protocol::{ErrorCode, ProtocolError};
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while serving sync requests.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Malformed or out-of-place request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or invalid credential.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Requested key or pointer has no entry.
    #[error("not found: {0}")]
    NotFound(String),

    /// Referenced session is unknown or already closed.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// Wire decoding failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Store-level failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Unexpected failure during handling.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Maps this error to a wire error class.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ServerError::InvalidRequest(_)
            | ServerError::UnknownSession(_)
            | ServerError::Protocol(_) => ErrorCode::BadRequest,
            ServerError::AuthenticationFailed(_) => ErrorCode::Unauthorized,
            ServerError::NotFound(_) => ErrorCode::NotFound,
            ServerError::Store(e) if e.is_not_found() => ErrorCode::NotFound,
            ServerError::Store(_) | ServerError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Returns true if this is a client error (4xx class).
    pub fn is_client_error(&self) -> bool {
        self.error_code() != ErrorCode::Internal
    }

    /// Returns true if the requested entry simply does not exist.
    pub fn is_not_found(&self) -> bool {
        self.error_code() == ErrorCode::NotFound
    }

    /// The message put on the wire. Server-class failures are reported
    /// without internal detail.
    pub fn wire_message(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            "internal error".to_string()
        }
    }
}
