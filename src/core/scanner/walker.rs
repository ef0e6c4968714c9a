//! Directory walking implementation using walkdir.

use super::{filter::ExtensionFilter, MediaFile, MediaScanner, ScanResult};
use crate::core::exclusion::ExclusionSet;
use crate::error::ScanError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Configuration for the directory scanner
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    pub follow_symlinks: bool,
    /// Include dotfiles and descend into dot-directories
    pub include_hidden: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Filename suffixes to accept
    pub extensions: Vec<String>,
}

impl ScanConfig {
    pub fn with_extensions<S: AsRef<str>>(extensions: &[S]) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.as_ref().to_string()).collect(),
            ..Default::default()
        }
    }
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: ExtensionFilter,
    exclusions: ExclusionSet,
}

impl WalkDirScanner {
    pub fn new(config: ScanConfig) -> Self {
        let filter =
            ExtensionFilter::new(&config.extensions).with_hidden(config.include_hidden);

        Self {
            config,
            filter,
            exclusions: ExclusionSet::new(),
        }
    }

    /// Prune these directories (and everything below them) from the walk
    pub fn with_exclusions(mut self, exclusions: ExclusionSet) -> Self {
        self.exclusions = exclusions;
        self
    }

    fn is_pruned(&self, path: &Path, depth: usize, skipped: &mut Vec<PathBuf>) -> bool {
        if depth > 0 && !self.config.include_hidden {
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if hidden {
                debug!(path = %path.display(), "Skipping hidden directory");
                return true;
            }
        }

        if self.exclusions.is_excluded(path) {
            info!(path = %path.display(), "Skipping excluded directory");
            skipped.push(path.to_path_buf());
            return true;
        }

        false
    }
}

impl MediaScanner for WalkDirScanner {
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut files = Vec::new();
        let mut errors = Vec::new();
        let mut skipped_directories = Vec::new();

        let mut walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();

        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }

        let entries = walker.into_iter().filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && self.is_pruned(entry.path(), entry.depth(), &mut skipped_directories))
        });

        for entry_result in entries {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    let error = if e.io_error().map(|io| io.kind())
                        == Some(std::io::ErrorKind::PermissionDenied)
                    {
                        ScanError::PermissionDenied { path }
                    } else {
                        ScanError::ReadDirectory {
                            path,
                            source: std::io::Error::other(e.to_string()),
                        }
                    };
                    warn!(error = %error, "Walk error");
                    errors.push(error);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.filter.should_include(entry.path()) {
                continue;
            }

            match fs::metadata(entry.path()) {
                Ok(metadata) => files.push(MediaFile {
                    path: entry.path().to_path_buf(),
                    size: metadata.len(),
                    modified: metadata
                        .modified()
                        .unwrap_or(std::time::SystemTime::UNIX_EPOCH),
                }),
                Err(e) => {
                    let error = ScanError::ReadDirectory {
                        path: entry.path().to_path_buf(),
                        source: e,
                    };
                    warn!(error = %error, "Cannot stat file");
                    errors.push(error);
                }
            }
        }

        debug!(
            root = %root.display(),
            files = files.len(),
            errors = errors.len(),
            "Walk finished"
        );

        Ok(ScanResult {
            files,
            errors,
            skipped_directories,
        })
    }
}
