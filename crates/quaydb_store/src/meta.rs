//! Meta pointer store: mutable head registry with parent pruning.
//!
//! A pointer (e.g. "main") tracks the current state of one logical
//! database as a set of live head entries. Writing an entry that names
//! parents supersedes those parents; two entries written concurrently
//! (neither naming the other) both stay live until a later merge entry
//! names both. The store never picks a winner - it faithfully reports
//! the full causal frontier.

use crate::error::StoreResult;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// One meta entry: a head candidate for a pointer.
///
/// The shape matches the wire format exactly: `{cid, data, parents}`.
/// `data` is an opaque serialized database-state descriptor; the store
/// never inspects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaEntry {
    /// Content-derived identifier of this entry.
    pub cid: String,
    /// Opaque state descriptor (typically references content blocks).
    pub data: serde_json::Value,
    /// Identifiers of prior heads this entry supersedes.
    #[serde(default)]
    pub parents: Vec<String>,
}

impl MetaEntry {
    /// Creates an entry with no parents (a root head).
    pub fn root(cid: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            cid: cid.into(),
            data,
            parents: Vec::new(),
        }
    }

    /// Creates an entry superseding the given parents.
    pub fn child(
        cid: impl Into<String>,
        data: serde_json::Value,
        parents: Vec<String>,
    ) -> Self {
        Self {
            cid: cid.into(),
            data,
            parents,
        }
    }
}

/// A mutable, append-oriented pointer registry.
///
/// # Concurrency
///
/// `put_head` is atomic per pointer: the read-prune-insert sequence for
/// one pointer never interleaves with another writer's sequence for the
/// same pointer. Distinct pointers never contend.
///
/// # Ordering
///
/// `list_heads` returns a stable order (lexicographic by cid), but that
/// order carries no causal meaning; only the parent graph orders entries.
pub trait MetaStore: Send + Sync {
    /// Appends `entry` as a live head of `pointer`, then removes every
    /// head named in `entry.parents` (absent parent is a no-op).
    fn put_head(&self, pointer: &str, entry: MetaEntry) -> StoreResult<()>;

    /// Batch form of [`MetaStore::put_head`]; entries apply in order
    /// under a single per-pointer critical section.
    fn put_heads(&self, pointer: &str, entries: Vec<MetaEntry>) -> StoreResult<()>;

    /// Returns the current causal frontier for `pointer`.
    ///
    /// As a safety net, entries whose `cid` appears in another live
    /// entry's `parents` are filtered out at read time even if a writer
    /// forgot to prune. Unknown pointers yield an empty vec.
    fn list_heads(&self, pointer: &str) -> StoreResult<Vec<MetaEntry>>;

    /// Removes all live heads for `pointer` (pointer teardown).
    /// Idempotent.
    fn delete_heads(&self, pointer: &str) -> StoreResult<()>;

    /// Removes specific entries by cid. Absent cids are a no-op.
    fn delete_entries(&self, pointer: &str, cids: &[String]) -> StoreResult<()>;
}

type HeadMap = BTreeMap<String, MetaEntry>;

/// In-memory meta store.
///
/// Heads live in a `BTreeMap` keyed by cid, so concurrent inserts and
/// removals commute and iteration order is stable.
#[derive(Debug, Default)]
pub struct MemoryMetaStore {
    pointers: RwLock<HashMap<String, Arc<Mutex<HeadMap>>>>,
}

impl MemoryMetaStore {
    /// Creates a new empty meta store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of pointers with at least one recorded entry.
    pub fn pointer_count(&self) -> usize {
        self.pointers.read().len()
    }

    fn pointer(&self, name: &str) -> Arc<Mutex<HeadMap>> {
        if let Some(heads) = self.pointers.read().get(name) {
            return Arc::clone(heads);
        }
        let mut pointers = self.pointers.write();
        Arc::clone(
            pointers
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(BTreeMap::new()))),
        )
    }
}

/// Applies one entry to a head map: insert, then prune parents.
pub(crate) fn apply_entry(heads: &mut HeadMap, entry: MetaEntry) {
    let parents = entry.parents.clone();
    heads.insert(entry.cid.clone(), entry);
    for parent in &parents {
        // Already-removed parent is not an error
        heads.remove(parent);
    }
}

/// Read-time frontier filter: drops entries superseded by a live entry.
pub(crate) fn frontier(heads: &HeadMap) -> Vec<MetaEntry> {
    let superseded: HashSet<&str> = heads
        .values()
        .flat_map(|e| e.parents.iter().map(String::as_str))
        .collect();
    heads
        .values()
        .filter(|e| !superseded.contains(e.cid.as_str()))
        .cloned()
        .collect()
}

impl MetaStore for MemoryMetaStore {
    fn put_head(&self, pointer: &str, entry: MetaEntry) -> StoreResult<()> {
        let heads = self.pointer(pointer);
        let mut heads = heads.lock();
        debug!(pointer, cid = %entry.cid, parents = entry.parents.len(), "put head");
        apply_entry(&mut heads, entry);
        Ok(())
    }

    fn put_heads(&self, pointer: &str, entries: Vec<MetaEntry>) -> StoreResult<()> {
        let heads = self.pointer(pointer);
        let mut heads = heads.lock();
        for entry in entries {
            apply_entry(&mut heads, entry);
        }
        Ok(())
    }

    fn list_heads(&self, pointer: &str) -> StoreResult<Vec<MetaEntry>> {
        let Some(heads) = self.pointers.read().get(pointer).map(Arc::clone) else {
            return Ok(Vec::new());
        };
        let heads = heads.lock();
        Ok(frontier(&heads))
    }

    fn delete_heads(&self, pointer: &str) -> StoreResult<()> {
        self.pointers.write().remove(pointer);
        Ok(())
    }

    fn delete_entries(&self, pointer: &str, cids: &[String]) -> StoreResult<()> {
        let Some(heads) = self.pointers.read().get(pointer).map(Arc::clone) else {
            return Ok(());
        };
        let mut heads = heads.lock();
        for cid in cids {
            heads.remove(cid);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn entry(cid: &str, parents: &[&str]) -> MetaEntry {
        MetaEntry::child(
            cid,
            json!({ "ref": cid }),
            parents.iter().map(|p| p.to_string()).collect(),
        )
    }

    fn head_cids(store: &MemoryMetaStore, pointer: &str) -> Vec<String> {
        store
            .list_heads(pointer)
            .unwrap()
            .into_iter()
            .map(|e| e.cid)
            .collect()
    }

    #[test]
    fn empty_pointer_has_no_heads() {
        let store = MemoryMetaStore::new();
        assert!(store.list_heads("main").unwrap().is_empty());
    }

    #[test]
    fn child_prunes_parent() {
        let store = MemoryMetaStore::new();
        store.put_head("main", entry("e1", &[])).unwrap();
        store.put_head("main", entry("e2", &["e1"])).unwrap();
        assert_eq!(head_cids(&store, "main"), vec!["e2"]);
    }

    #[test]
    fn concurrent_writes_both_stay_live() {
        let store = MemoryMetaStore::new();
        store.put_head("main", entry("e1", &[])).unwrap();
        store.put_head("main", entry("e2", &[])).unwrap();
        assert_eq!(head_cids(&store, "main"), vec!["e1", "e2"]);
    }

    #[test]
    fn merge_collapses_frontier() {
        let store = MemoryMetaStore::new();
        store.put_head("main", entry("e1", &[])).unwrap();
        store.put_head("main", entry("e2", &[])).unwrap();
        store.put_head("main", entry("e3", &["e1", "e2"])).unwrap();
        assert_eq!(head_cids(&store, "main"), vec!["e3"]);
    }

    #[test]
    fn pruning_absent_parent_is_noop() {
        let store = MemoryMetaStore::new();
        store.put_head("main", entry("e2", &["never-seen"])).unwrap();
        assert_eq!(head_cids(&store, "main"), vec!["e2"]);
    }

    #[test]
    fn read_time_prune_filters_superseded_late_arrival() {
        let store = MemoryMetaStore::new();
        // Child arrives before its parent; when the parent shows up it
        // must not resurface as a head.
        store.put_head("main", entry("e2", &["e1"])).unwrap();
        store.put_head("main", entry("e1", &[])).unwrap();
        assert_eq!(head_cids(&store, "main"), vec!["e2"]);
    }

    #[test]
    fn delete_heads_is_idempotent() {
        let store = MemoryMetaStore::new();
        store.put_head("main", entry("e1", &[])).unwrap();
        store.delete_heads("main").unwrap();
        store.delete_heads("main").unwrap();
        assert!(store.list_heads("main").unwrap().is_empty());
    }

    #[test]
    fn delete_entries_by_cid() {
        let store = MemoryMetaStore::new();
        store.put_head("main", entry("e1", &[])).unwrap();
        store.put_head("main", entry("e2", &[])).unwrap();
        store
            .delete_entries("main", &["e1".to_string(), "ghost".to_string()])
            .unwrap();
        assert_eq!(head_cids(&store, "main"), vec!["e2"]);
    }

    #[test]
    fn pointers_are_independent() {
        let store = MemoryMetaStore::new();
        store.put_head("main", entry("e1", &[])).unwrap();
        store.put_head("drafts", entry("d1", &[])).unwrap();
        assert_eq!(head_cids(&store, "main"), vec!["e1"]);
        assert_eq!(head_cids(&store, "drafts"), vec!["d1"]);
    }

    #[test]
    fn batch_put_applies_in_order() {
        let store = MemoryMetaStore::new();
        store
            .put_heads("main", vec![entry("e1", &[]), entry("e2", &["e1"])])
            .unwrap();
        assert_eq!(head_cids(&store, "main"), vec!["e2"]);
    }

    #[test]
    fn concurrent_writers_never_corrupt_the_live_set() {
        let store = Arc::new(MemoryMetaStore::new());
        let mut handles = Vec::new();
        for w in 0..4u8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                let mut prev: Option<String> = None;
                for i in 0..50 {
                    let cid = format!("w{w}-{i}");
                    let parents = prev.take().into_iter().collect();
                    store
                        .put_head("main", MetaEntry::child(&cid, json!(i), parents))
                        .unwrap();
                    prev = Some(cid);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        // Each writer chained its own entries, so exactly its last entry
        // survives per writer.
        let heads = head_cids(&store, "main");
        assert_eq!(heads.len(), 4);
        for w in 0..4u8 {
            assert!(heads.contains(&format!("w{w}-49")));
        }
    }

    proptest! {
        #[test]
        fn frontier_invariants_hold(ops in proptest::collection::vec((0u8..16, proptest::collection::vec(0u8..16, 0..3)), 1..40)) {
            let store = MemoryMetaStore::new();
            let mut inserted = HashSet::new();
            for (id, parents) in &ops {
                let cid = format!("c{id}");
                let parents: Vec<String> = parents.iter().map(|p| format!("c{p}")).filter(|p| *p != cid).collect();
                inserted.insert(cid.clone());
                store.put_head("p", MetaEntry::child(&cid, json!(null), parents)).unwrap();
            }
            let heads = store.list_heads("p").unwrap();
            // Every head was actually inserted
            for head in &heads {
                prop_assert!(inserted.contains(&head.cid));
            }
            // No head is named as a parent by another head
            let parents: HashSet<&str> = heads.iter().flat_map(|h| h.parents.iter().map(String::as_str)).collect();
            for head in &heads {
                prop_assert!(!parents.contains(head.cid.as_str()));
            }
        }
    }
}
