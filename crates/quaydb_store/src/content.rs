//! Content store trait definition.

use crate::error::StoreResult;
use sha2::{Digest, Sha256};

/// An addressable, immutable binary blob store.
///
/// Keys are content-derived identifiers produced by the layer above
/// (see [`content_id`]). The store itself does not verify that a key
/// matches its bytes - a collision between different bytes under the
/// same key is a caller error.
///
/// # Invariants
///
/// - A given key always maps to the same bytes; re-putting identical
///   bytes is an observable no-op.
/// - `delete` of an absent key succeeds (idempotent delete).
/// - Writes to distinct keys are independent; no cross-key atomicity
///   is promised.
///
/// # Implementors
///
/// - [`super::MemoryContentStore`] - for tests and ephemeral deployments
/// - [`super::FileContentStore`] - for persistent storage
pub trait ContentStore: Send + Sync {
    /// Stores `bytes` under `key`. Overwrite is safe because content
    /// is immutable by contract.
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()>;

    /// Returns the bytes stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::NotFound`] if no entry exists.
    fn get(&self, key: &str) -> StoreResult<Vec<u8>>;

    /// Removes the entry for `key`. Succeeds even if the key is absent.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Returns true if an entry exists for `key`.
    fn contains(&self, key: &str) -> StoreResult<bool>;

    /// Returns all stored keys, in no particular order.
    ///
    /// Used for garbage collection and inspection; collection itself
    /// is never run automatically.
    fn keys(&self) -> StoreResult<Vec<String>>;
}

/// Derives a content identifier from a byte payload (hex SHA-256).
pub fn content_id(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write;
        // infallible for String
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Escapes an opaque key into a string safe for use as a file name.
///
/// Alphanumerics, `-` and `_` pass through; every other byte becomes
/// `%XX`. The escaping is reversible via [`unescape_key`].
pub fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => out.push(byte as char),
            _ => {
                use std::fmt::Write;
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}

/// Reverses [`escape_key`]. Returns `None` for malformed input.
pub fn unescape_key(escaped: &str) -> Option<String> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_id_is_stable() {
        let a = content_id(b"hello");
        let b = content_id(b"hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn content_id_differs_per_payload() {
        assert_ne!(content_id(b"hello"), content_id(b"world"));
    }

    #[test]
    fn escape_roundtrip() {
        for key in ["plain", "with/slash", "dots..", "q?a=1&b=2", "ünïcode"] {
            let escaped = escape_key(key);
            assert!(!escaped.contains('/'));
            assert!(!escaped.contains('.'));
            assert_eq!(unescape_key(&escaped).as_deref(), Some(key));
        }
    }

    #[test]
    fn unescape_rejects_malformed() {
        assert!(unescape_key("%").is_none());
        assert!(unescape_key("%zz").is_none());
    }
}
