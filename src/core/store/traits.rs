//! Hash store trait definition.

use super::HashRecord;
use crate::error::StoreError;
use std::path::{Path, PathBuf};

/// Trait for hash store backends
pub trait HashStore: Send + Sync {
    /// Stored fingerprint for exactly this path, if any
    fn get_hash(&self, path: &Path) -> Result<Option<String>, StoreError> {
        Ok(self.get_record(path)?.map(|record| record.hash))
    }

    /// Full record (hash and mtime) for exactly this path
    fn get_record(&self, path: &Path) -> Result<Option<HashRecord>, StoreError>;

    /// Whether any record, under any path, carries this fingerprint.
    ///
    /// This is the duplicate predicate.
    fn hash_exists(&self, hash: &str) -> Result<bool, StoreError>;

    /// All registered paths carrying this fingerprint, oldest first
    fn paths_with_hash(&self, hash: &str) -> Result<Vec<PathBuf>, StoreError>;

    /// Insert or overwrite the record for `path`, stamping its current mtime.
    ///
    /// Fails with `StoreError::NotFound` if `path` is not an existing file.
    fn add_or_update(&self, path: &Path, hash: &str) -> Result<(), StoreError>;

    /// Delete the record for `path`. Returns whether a record existed.
    fn remove(&self, path: &Path) -> Result<bool, StoreError>;

    /// Number of records in the store
    fn record_count(&self) -> Result<usize, StoreError>;

    /// Remove records whose file no longer exists
    ///
    /// Returns the number of records removed.
    fn prune_orphans(&self) -> Result<usize, StoreError>;
}
