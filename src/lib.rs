//! # Media Vault
//!
//! Imports photo backups into a date-sorted library and keeps perceptual
//! duplicates out of it.
//!
//! ## Architecture
//! - `core` - Hash store, duplicate detection engine and media import
//! - `config` - Typed properties file
//! - `events` - Progress reporting for front ends
//! - `error` - Error types

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{MediaVaultError, Result};

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Log file written inside the library root
pub const HISTORY_LOG: &str = "history.log";

/// Where log lines go
#[derive(Debug, Clone, Copy)]
pub enum LogTarget<'a> {
    Stderr,
    /// Append to this file
    File(&'a Path),
}

/// Initialize tracing for the library
///
/// This should be called once by the application entry point. The filter
/// comes from `RUST_LOG` and defaults to `info`. A log file that cannot be
/// opened falls back to stderr.
pub fn init_tracing(target: LogTarget<'_>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match target.open() {
        Some(file) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    if let Err(e) = installed {
        eprintln!("tracing already initialized: {e}");
    }
}

impl LogTarget<'_> {
    fn open(self) -> Option<File> {
        let LogTarget::File(path) = self else {
            return None;
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("cannot open log file {}: {e}", path.display());
                None
            }
        }
    }
}
