//! File-backed content store for persistent deployments.

use crate::content::{escape_key, unescape_key, ContentStore};
use crate::error::{StoreError, StoreResult};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// A file-backed content store.
///
/// Each entry is a single file under the root directory, named by the
/// escaped key. Writes go to a temporary file first and are renamed
/// into place, so a crash mid-write never leaves a truncated entry.
///
/// # Example
///
/// ```no_run
/// use quaydb_store::{ContentStore, FileContentStore};
/// use std::path::Path;
///
/// let store = FileContentStore::open(Path::new("blocks")).unwrap();
/// store.put("abc123", b"persistent payload").unwrap();
/// ```
#[derive(Debug)]
pub struct FileContentStore {
    root: PathBuf,
}

impl FileContentStore {
    /// Opens a content store rooted at `root`, creating the directory
    /// if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: &Path) -> StoreResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Returns the root directory of this store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(escape_key(key))
    }
}

impl ContentStore for FileContentStore {
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        let path = self.entry_path(key);
        let tmp = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        match fs::read(self.entry_path(key)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entry_path(key).exists())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.ends_with(".tmp") {
                continue;
            }
            match unescape_key(name) {
                Some(key) => keys.push(key),
                None => {
                    return Err(StoreError::Corrupted(format!(
                        "unreadable entry name: {name}"
                    )))
                }
            }
        }
        Ok(keys)
    }
}
