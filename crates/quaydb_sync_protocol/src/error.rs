//! Error types for protocol encoding and decoding.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The body is not valid JSON or misses required fields.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The `type` tag names no known message.
    ///
    /// This is a client error, never a protocol-fatal condition: the
    /// dispatcher answers it and keeps serving.
    #[error("unknown message type: {0}")]
    UnknownType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_type_tag() {
        let err = ProtocolError::UnknownType("frobnicate".into());
        assert!(err.to_string().contains("frobnicate"));
    }
}
