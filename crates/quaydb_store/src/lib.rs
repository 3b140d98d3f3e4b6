//! # QuayDB Store
//!
//! Storage primitives for the QuayDB sync core:
//!
//! - [`ContentStore`]: addressable, immutable binary blobs keyed by
//!   content-derived identifiers (memory and file backends)
//! - [`MetaStore`]: mutable pointer registry holding a bounded set of
//!   concurrent head entries with parent pruning (memory and append-log
//!   backends)
//!
//! ## Conflict discipline
//!
//! The meta store preserves the full causal frontier: concurrent heads
//! both stay live until a merge entry names them as parents. Merge
//! policy belongs to the embedded database above this layer; the store
//! never silently drops a concurrent head.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod content;
mod error;
mod file;
mod memory;
mod meta;
mod meta_log;

pub use content::{content_id, escape_key, unescape_key, ContentStore};
pub use error::{StoreError, StoreResult};
pub use file::FileContentStore;
pub use memory::MemoryContentStore;
pub use meta::{MemoryMetaStore, MetaEntry, MetaStore};
pub use meta_log::FileMetaStore;
