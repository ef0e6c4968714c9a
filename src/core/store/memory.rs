//! In-memory hash store for testing.

use super::{file_mtime, HashRecord, HashStore};
use crate::error::StoreError;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory hash store
///
/// Keeps insertion order so `paths_with_hash` behaves like the SQLite
/// backend. Still requires registered paths to exist on disk.
pub struct InMemoryHashStore {
    records: RwLock<Vec<HashRecord>>,
}

impl InMemoryHashStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<HashRecord>>, StoreError> {
        self.records.read().map_err(|_| StoreError::Poisoned {
            path: PathBuf::from("memory"),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<HashRecord>>, StoreError> {
        self.records.write().map_err(|_| StoreError::Poisoned {
            path: PathBuf::from("memory"),
        })
    }
}

impl Default for InMemoryHashStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HashStore for InMemoryHashStore {
    fn get_record(&self, path: &Path) -> Result<Option<HashRecord>, StoreError> {
        Ok(self.read()?.iter().find(|r| r.path == path).cloned())
    }

    fn hash_exists(&self, hash: &str) -> Result<bool, StoreError> {
        Ok(self.read()?.iter().any(|r| r.hash == hash))
    }

    fn paths_with_hash(&self, hash: &str) -> Result<Vec<PathBuf>, StoreError> {
        Ok(self
            .read()?
            .iter()
            .filter(|r| r.hash == hash)
            .map(|r| r.path.clone())
            .collect())
    }

    fn add_or_update(&self, path: &Path, hash: &str) -> Result<(), StoreError> {
        let mtime = file_mtime(path)?;
        let mut records = self.write()?;

        match records.iter_mut().find(|r| r.path == path) {
            Some(record) => {
                record.hash = hash.to_string();
                record.mtime = mtime;
            }
            None => records.push(HashRecord {
                path: path.to_path_buf(),
                hash: hash.to_string(),
                mtime,
            }),
        }

        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<bool, StoreError> {
        let mut records = self.write()?;
        let before = records.len();
        records.retain(|r| r.path != path);
        Ok(records.len() != before)
    }

    fn record_count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }

    fn prune_orphans(&self) -> Result<usize, StoreError> {
        let mut records = self.write()?;
        let before = records.len();
        records.retain(|r| r.path.is_file());
        Ok(before - records.len())
    }
}
