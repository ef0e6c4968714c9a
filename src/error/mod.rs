//! # Error Module
//!
//! Error types for the media vault.
//!
//! ## Propagation
//! - Per-file problems (decode failures, vanished files, failed disposals) are
//!   caught at the file boundary, logged, and never abort a batch
//! - Only configuration loading and store initialization are fatal to a run
//! - Every variant that concerns a file carries its path

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum MediaVaultError {
    #[error("Hash store error: {0}")]
    Store(#[from] StoreError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Disposal error: {0}")]
    Disposal(#[from] DisposalError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Aborted: {0}")]
    Aborted(String),
}

/// Errors raised by the hash store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cannot register {path}: file not found")]
    NotFound { path: PathBuf },

    #[error("Hash database unavailable at {path}: {reason}")]
    Unavailable { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Hash database lock poisoned at {path}. Restart and try again.")]
    Poisoned { path: PathBuf },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}

/// Errors that occur while fingerprinting an image
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to decode image {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Image is empty: {path}")]
    EmptyImage { path: PathBuf },

    #[error("Failed to read image file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Normalization failed: {0}")]
    NormalizeFailed(String),
}

/// Errors that occur while walking a directory tree
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while archiving or deleting a confirmed duplicate
#[derive(Error, Debug)]
pub enum DisposalError {
    #[error("Failed to archive {path} to {destination}: {source}")]
    Move {
        path: PathBuf,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive directory {path} could not be created: {source}")]
    ArchiveDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archived copy of {path} is {actual} bytes, expected {expected}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },
}

/// Errors that occur while loading the properties file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Properties file missing: {path}")]
    Missing { path: PathBuf },

    #[error("Could not determine a properties file location. Pass --config or set MEDIA_DB.")]
    NoLocation,

    #[error("Invalid properties file {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// Errors that occur while importing a single media file
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Import source not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Copy of {path} is {actual} bytes, expected {expected}; original kept")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Failed to write sidecar {path}: {source}")]
    Sidecar {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Filesystem error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, MediaVaultError>;
