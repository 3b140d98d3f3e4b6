//! Append-log backed meta store.
//!
//! Every mutation is appended to a JSON-lines log and replayed on open,
//! so the live set survives process restarts. The in-memory projection
//! is the same head-map structure the memory store uses.

use crate::error::{StoreError, StoreResult};
use crate::meta::{MemoryMetaStore, MetaEntry, MetaStore};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// One record in the meta log.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
enum LogRecord {
    PutHead {
        pointer: String,
        entry: MetaEntry,
    },
    DeleteEntries {
        pointer: String,
        cids: Vec<String>,
    },
    DeleteHeads {
        pointer: String,
    },
}

/// A meta store persisted as an append-only JSON-lines log.
///
/// `open` replays the log into memory (init = load persisted state);
/// `flush` forces appended records to disk (teardown). Superseded
/// entries are pruned from the projection but stay in the log until the
/// log is compacted externally.
pub struct FileMetaStore {
    path: PathBuf,
    log: Mutex<File>,
    projection: MemoryMetaStore,
}

impl FileMetaStore {
    /// Opens the log at `path`, creating it if absent, and replays it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupted`] if a log line fails to decode.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let projection = MemoryMetaStore::new();
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            for (lineno, line) in reader.lines().enumerate() {
                let line = line?;
                if line.is_empty() {
                    continue;
                }
                let record: LogRecord = serde_json::from_str(&line).map_err(|e| {
                    StoreError::Corrupted(format!("meta log line {}: {e}", lineno + 1))
                })?;
                Self::replay(&projection, record)?;
            }
        }
        let log = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            log: Mutex::new(log),
            projection,
        })
    }

    /// Returns the path of the underlying log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Forces all appended records to durable storage.
    pub fn flush(&self) -> StoreResult<()> {
        let log = self.log.lock();
        log.sync_all()?;
        Ok(())
    }

    fn replay(projection: &MemoryMetaStore, record: LogRecord) -> StoreResult<()> {
        match record {
            LogRecord::PutHead { pointer, entry } => projection.put_head(&pointer, entry),
            LogRecord::DeleteEntries { pointer, cids } => {
                projection.delete_entries(&pointer, &cids)
            }
            LogRecord::DeleteHeads { pointer } => projection.delete_heads(&pointer),
        }
    }

    fn append(&self, record: &LogRecord) -> StoreResult<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| StoreError::Corrupted(format!("meta log encode: {e}")))?;
        let mut log = self.log.lock();
        log.write_all(line.as_bytes())?;
        log.write_all(b"\n")?;
        log.flush()?;
        Ok(())
    }
}

impl MetaStore for FileMetaStore {
    fn put_head(&self, pointer: &str, entry: MetaEntry) -> StoreResult<()> {
        self.append(&LogRecord::PutHead {
            pointer: pointer.to_string(),
            entry: entry.clone(),
        })?;
        self.projection.put_head(pointer, entry)
    }

    fn put_heads(&self, pointer: &str, entries: Vec<MetaEntry>) -> StoreResult<()> {
        for entry in &entries {
            self.append(&LogRecord::PutHead {
                pointer: pointer.to_string(),
                entry: entry.clone(),
            })?;
        }
        self.projection.put_heads(pointer, entries)
    }

    fn list_heads(&self, pointer: &str) -> StoreResult<Vec<MetaEntry>> {
        self.projection.list_heads(pointer)
    }

    fn delete_heads(&self, pointer: &str) -> StoreResult<()> {
        self.append(&LogRecord::DeleteHeads {
            pointer: pointer.to_string(),
        })?;
        self.projection.delete_heads(pointer)
    }

    fn delete_entries(&self, pointer: &str, cids: &[String]) -> StoreResult<()> {
        self.append(&LogRecord::DeleteEntries {
            pointer: pointer.to_string(),
            cids: cids.to_vec(),
        })?;
        self.projection.delete_entries(pointer, cids)
    }
}

impl Drop for FileMetaStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("meta log flush on drop failed: {e}");
        }
    }
}
