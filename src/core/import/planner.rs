//! Destination naming for imported media.

use crate::core::transfer::unique_path;
use chrono::{Datelike, NaiveDateTime};
use std::path::{Path, PathBuf};

/// Folder below the root for media without a capture date
pub const UNSORTED_DIR: &str = "unsorted";

/// Where a file should land in the library.
///
/// With a capture date: `<root>/<YYYY>/<YYYYMMDD_HHMMSS><ext>`, keeping the
/// original name if it already starts with the date's `YYYYMMDD`. Without
/// one: `<root>/unsorted/<name>`. The result never collides with an
/// existing file.
pub fn plan_destination(root: &Path, source: &Path, taken: Option<NaiveDateTime>) -> PathBuf {
    let filename = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let candidate = match taken {
        Some(taken) => {
            let stamp = taken.format("%Y%m%d_%H%M%S").to_string();
            let name = if filename.starts_with(&stamp[..8]) {
                filename
            } else {
                format!("{stamp}{}", extension_of(source))
            };
            root.join(format!("{:04}", taken.year())).join(name)
        }
        None => root.join(UNSORTED_DIR).join(filename),
    };

    unique_path(&candidate)
}

/// Extension including its dot, case preserved; empty when absent
fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}
