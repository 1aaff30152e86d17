//! Persistence of rendered series.
//!
//! `FsStore` guarantees at most one writer per key inside the process (lock
//! map keyed by storage key) and never exposes a half-written file: bytes go
//! to a temporary file in the target directory which is then renamed over
//! the target. A key's lock is dropped from the map once its last writer is
//! done, so the map only holds keys being written.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;

use crate::error::PersistenceError;

/// Where rendered series are written.
pub trait SeriesStore: Send + Sync {
    /// Write `bytes` under `key`, replacing any previous content.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, PersistenceError>;

    fn exists(&self, key: &str) -> bool;
}

/// Filesystem store rooted at a directory.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(key.to_string()).or_default().clone()
    }

    /// Forget the key's lock once no other writer holds a handle to it.
    fn release_key(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // One handle in the map, one here. Dropped under the map lock so a
        // concurrent release sees the final count.
        let last = Arc::strong_count(&lock) == 2;
        drop(lock);
        if last {
            locks.remove(key);
        }
    }

    fn write_locked(&self, target: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.root).map_err(|e| PersistenceError::new(&self.root, e))?;

        let mut tmp = NamedTempFile::new_in(&self.root).map_err(|e| PersistenceError::new(target, e))?;
        tmp.write_all(bytes).map_err(|e| PersistenceError::new(target, e))?;
        tmp.as_file().sync_all().map_err(|e| PersistenceError::new(target, e))?;
        tmp.persist(target).map_err(|e| PersistenceError::new(target, e.error))?;
        Ok(())
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}

impl SeriesStore for FsStore {
    fn write(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, PersistenceError> {
        let target = self.path_for(key);
        let lock = self.key_lock(key);
        let result = {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            self.write_locked(&target, bytes)
        };
        self.release_key(key, lock);
        result?;

        tracing::info!(path = %target.display(), bytes = bytes.len(), "series written");
        Ok(target)
    }

    fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }
}
