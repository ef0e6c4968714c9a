//! # Store Module
//!
//! Content-addressed hash store: maps a file path to its perceptual
//! fingerprint, and answers "has this fingerprint been seen before?".
//!
//! ## Semantics
//! - `path` is the uniqueness key, at most one record per path
//! - `hash` is a plain comparison value; many paths may share one
//! - Records are never deleted because a file disappeared. Stale entries are
//!   tolerated and can be dropped with `prune_orphans`
//!
//! ## Backends
//! - `SqliteHashStore` - Persistent storage using SQLite
//! - `InMemoryHashStore` - For testing

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryHashStore;
pub use sqlite::SqliteHashStore;
pub use traits::HashStore;

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// A persisted path -> hash row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashRecord {
    /// Absolute path of the registered file
    pub path: PathBuf,
    /// Perceptual fingerprint
    pub hash: String,
    /// File modification time (seconds since the epoch) when it was hashed
    pub mtime: f64,
}

/// How fingerprints are canonicalized before they are stored or compared.
///
/// Fingerprints produced by this crate are already lowercase hex, so the
/// default leaves them untouched. Other modes let hashes from another
/// producer share the table without a schema change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashNormalization {
    #[default]
    Verbatim,
    /// Trim whitespace and lowercase (for uppercase hex producers)
    LowercaseHex,
}

impl HashNormalization {
    pub fn apply<'a>(&self, hash: &'a str) -> Cow<'a, str> {
        match self {
            HashNormalization::Verbatim => Cow::Borrowed(hash),
            HashNormalization::LowercaseHex => Cow::Owned(hash.trim().to_ascii_lowercase()),
        }
    }
}

/// Modification time of an existing regular file, as fractional seconds.
///
/// Fails with `StoreError::NotFound` when `path` is not a file, which is
/// what keeps deleted files out of the store.
pub fn file_mtime(path: &Path) -> Result<f64, StoreError> {
    let metadata = fs::metadata(path).map_err(|_| StoreError::NotFound {
        path: path.to_path_buf(),
    })?;

    if !metadata.is_file() {
        return Err(StoreError::NotFound {
            path: path.to_path_buf(),
        });
    }

    Ok(metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0))
}
