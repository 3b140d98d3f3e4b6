//! Error types for store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No entry exists for the requested key.
    #[error("not found: {0}")]
    NotFound(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A persisted record could not be decoded.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// The store has been torn down.
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// Returns true if this error means the key simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
