//! # Import Module
//!
//! Copies media from a backup export into the date-sorted library.
//!
//! ## Per File
//! 1. Capture date from EXIF, else from the JSON sidecar
//! 2. Destination `<root>/<YYYY>/<YYYYMMDD_HHMMSS><ext>`, or `<root>/unsorted`
//! 3. Images only: duplicate check against the hash store. Duplicates go to
//!    the archive directory when archiving is active and are skipped otherwise
//! 4. Verified copy, capture time applied as the file's mtime
//! 5. Sidecar copied into `_json/` next to the new file
//! 6. Originals removed when `delete_after_copy` is set
//!
//! Every file gets a bounded number of attempts; a file that still fails is
//! counted and the import moves on.

mod importer;
mod planner;
mod sidecar;

pub use importer::MediaImporter;
pub use planner::{plan_destination, UNSORTED_DIR};
pub use sidecar::{Sidecar, SIDECAR_DIR};

use crate::core::scanner::{DEFAULT_IMAGE_EXTENSIONS, DEFAULT_VIDEO_EXTENSIONS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Attempts per file before it is counted as failed
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

/// Import behaviour
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Remove originals (and their sidecars) once the copy is verified
    pub delete_after_copy: bool,
    /// Check images against the hash store
    pub prevent_duplicates: bool,
    pub max_attempts: u32,
    pub image_extensions: Vec<String>,
    pub video_extensions: Vec<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            delete_after_copy: false,
            prevent_duplicates: true,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            image_extensions: DEFAULT_IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            video_extensions: DEFAULT_VIDEO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// What happened to one imported file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ImportOutcome {
    Imported {
        to: PathBuf,
        kind: MediaKind,
        /// Whether the copy was recorded in the hash store
        registered: bool,
    },
    DuplicateArchived { to: PathBuf, original: PathBuf },
    /// Left at its source because archiving is off
    DuplicateSkipped { original: PathBuf },
}

impl ImportOutcome {
    /// Nothing was copied, so the original must stay
    pub fn left_at_source(&self) -> bool {
        matches!(self, ImportOutcome::DuplicateSkipped { .. })
    }
}

/// A file that failed every attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportFailure {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub reason: String,
}

/// Totals of an import
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub source: PathBuf,
    pub images_found: usize,
    pub videos_found: usize,
    pub images_imported: usize,
    pub videos_imported: usize,
    /// Imported without a capture date
    pub unsorted: usize,
    pub duplicates_archived: usize,
    pub duplicates_skipped: usize,
    pub failures: Vec<ImportFailure>,
    /// Imported, but `delete_after_copy` could not remove the original
    pub originals_kept: Vec<PathBuf>,
    pub duration_ms: u64,
    pub cancelled: bool,
}

impl ImportSummary {
    pub fn images_failed(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.kind == MediaKind::Image)
            .count()
    }

    pub fn videos_failed(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.kind == MediaKind::Video)
            .count()
    }
}
