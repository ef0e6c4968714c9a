//! # Scanner Module
//!
//! Discovers media files below a directory.
//!
//! Files are selected by exact, case-sensitive filename suffix: `.jpg` and
//! `.JPG` are separate entries in the extension list. Excluded directories
//! are pruned during the walk, so nothing below them is ever visited.
//! Entries are yielded in filename order within each directory.
//!
//! ## Example
//! ```rust,ignore
//! use media_vault::core::scanner::{ScanConfig, WalkDirScanner, MediaScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::with_extensions(&[".jpg", ".JPG"]));
//! let result = scanner.scan(Path::new("/library"))?;
//! ```

mod filter;
mod walker;

pub use filter::ExtensionFilter;
pub use walker::{ScanConfig, WalkDirScanner};

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Image suffixes picked up when none are configured
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &[
    ".heic", ".HEIC", ".jpg", ".JPG", ".jpeg", ".JPEG", ".png", ".PNG",
];

/// Video suffixes picked up when none are configured
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &[".MOV", ".mov", ".mp4", ".MP4"];

/// A discovered media file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    pub modified: SystemTime,
}

/// Result of a walk
#[derive(Debug)]
pub struct ScanResult {
    pub files: Vec<MediaFile>,
    /// Unreadable entries, non-fatal
    pub errors: Vec<ScanError>,
    /// Directories pruned because they were excluded
    pub skipped_directories: Vec<PathBuf>,
}

/// Trait for media scanners
///
/// Implement this trait to feed the detector from somewhere other than the
/// filesystem (e.g., for testing).
pub trait MediaScanner: Send + Sync {
    /// Walk `root` recursively. Fails only if `root` itself is unusable.
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError>;
}
