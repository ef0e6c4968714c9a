//! # Core Module
//!
//! The front-end agnostic library engine.
//!
//! ## Modules
//! - `store` - Persistent path -> fingerprint records
//! - `hasher` - Perceptual fingerprints of decoded images
//! - `exclusion` - Directories kept out of scanning and registration
//! - `scanner` - Discovers media files in directories
//! - `engine` - Classifies files as new or duplicate and disposes duplicates
//! - `metadata` - Reads capture dates from EXIF
//! - `import` - Copies a backup export into the date-sorted library
//! - `transfer` - Verified copies and moves

pub mod engine;
pub mod exclusion;
pub mod hasher;
pub mod import;
pub mod metadata;
pub mod scanner;
pub mod store;
pub mod transfer;

// Re-export commonly used types
pub use engine::{
    ArchiveConfig, CancellationToken, Classification, DetectorBuilder, DuplicateDetector,
    DuplicateRun, ScanReport,
};
pub use import::{ImportOptions, ImportSummary, MediaImporter};
pub use scanner::MediaFile;
pub use store::{HashStore, SqliteHashStore};
