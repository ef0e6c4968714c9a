//! # Exclusion Module
//!
//! Directory-prefix exclusion. A directory is excluded when it equals, or
//! sits below, any directory in the set. Paths are canonicalized before
//! comparison so `..`, `.` and symlinked roots resolve to the same place.
//! A path that cannot be resolved never matches.

use crate::error::MediaVaultError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Ordered set of excluded directories for one detector
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    directories: Vec<PathBuf>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one directory. Relative entries are joined onto `root`.
    pub fn add(&mut self, root: &Path, entry: impl AsRef<Path>) -> Result<(), MediaVaultError> {
        let entry = entry.as_ref();
        if entry.as_os_str().is_empty() {
            return Err(MediaVaultError::InvalidArgument(
                "exclusion directory must not be empty".to_string(),
            ));
        }

        let directory = root.join(entry);
        debug!(directory = %directory.display(), "Excluding directory");
        if !self.directories.contains(&directory) {
            self.directories.push(directory);
        }
        Ok(())
    }

    pub fn is_excluded(&self, candidate: &Path) -> bool {
        is_excluded(candidate, &self.directories)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.directories.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.directories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }
}

/// True when `candidate` equals or descends from any of `exclusions`.
pub fn is_excluded(candidate: &Path, exclusions: &[PathBuf]) -> bool {
    if exclusions.is_empty() {
        return false;
    }

    let Ok(candidate) = candidate.canonicalize() else {
        return false;
    };

    exclusions.iter().any(|excluded| {
        excluded
            .canonicalize()
            .map(|excluded| candidate.starts_with(&excluded))
            .unwrap_or(false)
    })
}
