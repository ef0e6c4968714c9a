//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the vault
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Duplicate scan events
    Scan(ScanEvent),
    /// Duplicate disposal events
    Dispose(DisposeEvent),
    /// Media import events
    Import(ImportEvent),
}

/// Events during a duplicate scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { root: PathBuf, run_id: String },
    /// The walk finished and classification is about to begin
    FilesDiscovered { total: usize },
    /// One more file was classified
    Progress(ScanProgress),
    /// A file matched an already registered fingerprint
    DuplicateFound { path: PathBuf },
    /// A file could not be classified but scanning continues
    Error { path: PathBuf, message: String },
    /// The scan was stopped through its cancellation token
    Cancelled,
    /// Scanning completed
    Completed {
        scanned: usize,
        new: usize,
        duplicates: usize,
        unclassifiable: usize,
    },
}

/// Progress information during a scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Files classified so far
    pub completed: usize,
    /// Files the walk discovered
    pub total: usize,
    /// File just classified
    pub current_path: PathBuf,
    /// Duplicates found so far
    pub duplicates: usize,
}

/// Events while archiving or deleting duplicates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DisposeEvent {
    /// `archive` is `None` when duplicates are deleted
    Started {
        total: usize,
        archive: Option<PathBuf>,
    },
    Archived { path: PathBuf, destination: PathBuf },
    Deleted { path: PathBuf },
    Failed { path: PathBuf, message: String },
    Completed { disposed: usize, failed: usize },
}

/// Events during a media import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ImportEvent {
    Started { source: PathBuf, total: usize },
    Progress(ImportProgress),
    /// A file landed in the library
    Imported { from: PathBuf, to: PathBuf },
    /// An incoming duplicate was archived (`destination` set) or left in place
    DuplicateRouted {
        path: PathBuf,
        destination: Option<PathBuf>,
    },
    /// A file failed after every retry
    Failed { path: PathBuf, message: String },
    Completed {
        imported: usize,
        duplicates: usize,
        failed: usize,
    },
}

/// Progress information during an import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportProgress {
    pub completed: usize,
    pub total: usize,
    pub current_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Scan(ScanEvent::Progress(ScanProgress {
            completed: 10,
            total: 50,
            current_path: PathBuf::from("/library/2023/20230704_101500.jpg"),
            duplicates: 2,
        }));

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Scan(ScanEvent::Progress(p)) => {
                assert_eq!(p.completed, 10);
                assert_eq!(p.duplicates, 2);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn dispose_started_without_archive_serializes_null() {
        let event = Event::Dispose(DisposeEvent::Started {
            total: 3,
            archive: None,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("null"));
    }
}
