//! In-memory content store for testing and ephemeral deployments.

use crate::content::ContentStore;
use crate::error::{StoreError, StoreResult};
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory content store.
///
/// Suitable for unit tests, integration tests, and ephemeral databases
/// that do not need persistence.
///
/// # Thread Safety
///
/// The store is thread-safe and can be shared across threads behind an
/// `Arc`.
///
/// # Example
///
/// ```rust
/// use quaydb_store::{ContentStore, MemoryContentStore};
///
/// let store = MemoryContentStore::new();
/// store.put("blocks/abc", b"payload").unwrap();
/// assert_eq!(store.get("blocks/abc").unwrap(), b"payload");
/// ```
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryContentStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl ContentStore for MemoryContentStore {
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        self.entries.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        // Absent key is a successful no-op
        self.entries.write().remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entries.read().contains_key(key))
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_roundtrip() {
        let store = MemoryContentStore::new();
        store.put("k", b"value").unwrap();
        assert_eq!(store.get("k").unwrap(), b"value");
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = MemoryContentStore::new();
        let result = store.get("missing");
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn put_is_idempotent() {
        let store = MemoryContentStore::new();
        store.put("k", b"same").unwrap();
        store.put("k", b"same").unwrap();
        assert_eq!(store.get("k").unwrap(), b"same");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_twice_succeeds() {
        let store = MemoryContentStore::new();
        store.put("k", b"value").unwrap();
        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert!(!store.contains("k").unwrap());
    }

    #[test]
    fn keys_enumerates_entries() {
        let store = MemoryContentStore::new();
        store.put("a", b"1").unwrap();
        store.put("b", b"2").unwrap();
        let mut keys = store.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
