//! File transfer helpers shared by disposal and import.
//!
//! Moves try `rename` first. Across filesystems they fall back to copy,
//! compare sizes, and only then delete the source, so a short copy never
//! costs the original.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Why a verified transfer failed
#[derive(Debug)]
pub enum TransferFailure {
    Io(io::Error),
    /// The copy came out a different size; it was removed and the source kept
    SizeMismatch { expected: u64, actual: u64 },
}

impl From<io::Error> for TransferFailure {
    fn from(e: io::Error) -> Self {
        TransferFailure::Io(e)
    }
}

/// First free variant of `path`: `name.ext`, then `name-01.ext`, `name-02.ext`, ...
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1u32..)
        .map(|counter| parent.join(format!("{stem}-{counter:02}{ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Copy `source` to `destination` and check the byte count.
///
/// Returns the number of bytes copied.
pub fn copy_verified(source: &Path, destination: &Path) -> Result<u64, TransferFailure> {
    let expected = fs::metadata(source)?.len();
    fs::copy(source, destination)?;

    let actual = fs::metadata(destination)?.len();
    if actual != expected {
        let _ = fs::remove_file(destination);
        return Err(TransferFailure::SizeMismatch { expected, actual });
    }

    Ok(actual)
}

/// Move `source` to `destination`, falling back to a verified copy + delete.
pub fn move_file(source: &Path, destination: &Path) -> Result<(), TransferFailure> {
    if fs::rename(source, destination).is_ok() {
        return Ok(());
    }

    copy_verified(source, destination)?;
    fs::remove_file(source)?;
    Ok(())
}
