//! # Engine Module
//!
//! Duplicate detection over a media library.
//!
//! ## Protocol
//! 1. **Scan** - Walk a directory, pruning excluded subtrees
//! 2. **Check** - Fingerprint each file and ask the store whether that
//!    fingerprint was seen before. First seen wins: new fingerprints are
//!    registered, repeats are collected into a `DuplicateRun`
//! 3. **Dispose** - Archive or delete the run's duplicates, as a separate
//!    explicit step
//!
//! Classification is a pure function of store contents, the exclusion set,
//! and file content. Files are processed one at a time in walk order.

mod detector;
mod disposal;

pub use detector::{DetectorBuilder, DuplicateDetector};

use crate::core::hasher::Fingerprint;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Where disposed duplicates go
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    pub enabled: bool,
    /// Relative paths are taken from the library root
    pub directory: Option<PathBuf>,
}

impl ArchiveConfig {
    pub fn new(enabled: bool, directory: Option<PathBuf>) -> Self {
        Self { enabled, directory }
    }

    /// Archive directory, when archiving is both enabled and configured.
    /// `None` means disposal deletes.
    pub fn target(&self) -> Option<&Path> {
        if self.enabled {
            self.directory.as_deref()
        } else {
            None
        }
    }

    pub fn is_active(&self) -> bool {
        self.target().is_some()
    }
}

/// Outcome of checking one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classification {
    /// First time this fingerprint was seen; the file is now registered
    New,
    /// Fingerprint already registered under `original`. With `self_match`
    /// the only record is the file's own, so it is not queued for disposal.
    Duplicate { original: PathBuf, self_match: bool },
    /// The file could not be fingerprinted or registered
    Unclassifiable { reason: String },
    /// The file's directory is excluded; the store was not consulted
    Excluded,
}

impl Classification {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Classification::Duplicate { .. })
    }

    /// Duplicate of a different registered file
    pub fn is_disposable(&self) -> bool {
        matches!(
            self,
            Classification::Duplicate {
                self_match: false,
                ..
            }
        )
    }
}

/// Outcome of checking a file that is about to be imported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingClassification {
    /// Not seen before. Register the final copy with this fingerprint.
    Unique(Fingerprint),
    Duplicate { original: PathBuf },
    Unclassifiable { reason: String },
    /// Destination directory is excluded, so no check was made
    Excluded,
}

/// One duplicate found during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateEntry {
    pub path: PathBuf,
    /// Registered path whose fingerprint it matched
    pub original: PathBuf,
}

/// Duplicates collected during one scan/check session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateRun {
    id: Uuid,
    entries: Vec<DuplicateEntry>,
}

impl DuplicateRun {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            entries: Vec::new(),
        }
    }

    /// Correlates log lines and events belonging to the run
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn push(&mut self, entry: DuplicateEntry) {
        if !self.entries.iter().any(|e| e.path == entry.path) {
            self.entries.push(entry);
        }
    }

    pub fn entries(&self) -> &[DuplicateEntry] {
        &self.entries
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|e| e.path.as_path())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DuplicateRun {
    fn default() -> Self {
        Self::new()
    }
}

/// A file that could not be classified, with the reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unclassified {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of a scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub root: PathBuf,
    /// Files the walk selected: matching extension, not hidden unless
    /// `include_hidden` is set, outside excluded directories
    pub files_scanned: usize,
    pub new: usize,
    /// Duplicates of another registered file; always `run.len()`
    pub duplicates: usize,
    /// Files that matched only their own earlier registration
    pub already_registered: usize,
    pub excluded: usize,
    pub cache_hits: usize,
    pub unclassifiable: Vec<Unclassified>,
    /// Walk and store errors (non-fatal)
    pub errors: Vec<String>,
    /// Duplicates eligible for disposal
    pub run: DuplicateRun,
    pub duration_ms: u64,
    pub cancelled: bool,
}

/// A disposed duplicate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Disposed {
    Archived { path: PathBuf, destination: PathBuf },
    Deleted { path: PathBuf },
}

/// Result of disposing a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisposalReport {
    pub disposed: Vec<Disposed>,
    pub failed: Vec<Unclassified>,
    /// Store records dropped for disposed paths
    pub records_removed: usize,
}

/// Cooperative cancellation, checked between files
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_requires_both_flag_and_directory() {
        assert!(!ArchiveConfig::default().is_active());
        assert!(!ArchiveConfig::new(true, None).is_active());
        assert!(!ArchiveConfig::new(false, Some("trash".into())).is_active());
        assert_eq!(
            ArchiveConfig::new(true, Some("trash".into())).target(),
            Some(Path::new("trash"))
        );
    }

    #[test]
    fn run_ignores_repeated_path() {
        let mut run = DuplicateRun::new();
        let entry = DuplicateEntry {
            path: "/library/b.jpg".into(),
            original: "/library/a.jpg".into(),
        };
        run.push(entry.clone());
        run.push(entry);

        assert_eq!(run.len(), 1);
    }

    #[test]
    fn runs_have_distinct_ids() {
        assert_ne!(DuplicateRun::new().id(), DuplicateRun::new().id());
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();

        clone.cancel();

        assert!(token.is_cancelled());
    }

    #[test]
    fn classification_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Classification::Duplicate {
            original: "/library/a.jpg".into(),
            self_match: false,
        })
        .unwrap();

        assert!(json.contains("\"kind\":\"duplicate\""));
    }
}
