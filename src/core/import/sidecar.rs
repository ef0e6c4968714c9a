//! JSON sidecars exported next to each media file by photo backups.
//!
//! A sidecar is named either `<stem>.json` or `<name>.json`. The only field
//! read is `photoTakenTime.timestamp`, seconds since the epoch in UTC, sent
//! as a string or a number depending on the exporter.

use crate::core::transfer::unique_path;
use crate::error::ImportError;
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Folder, next to imported media, that receives their sidecars
pub const SIDECAR_DIR: &str = "_json";

#[derive(Debug, Deserialize)]
struct TakeoutMetadata {
    #[serde(rename = "photoTakenTime")]
    photo_taken_time: Option<TakenTime>,
}

#[derive(Debug, Deserialize)]
struct TakenTime {
    timestamp: Timestamp,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Timestamp {
    Text(String),
    Number(i64),
}

impl Timestamp {
    fn seconds(&self) -> Option<i64> {
        match self {
            Timestamp::Text(text) => text.trim().parse().ok(),
            Timestamp::Number(n) => Some(*n),
        }
    }
}

/// A sidecar found next to a media file
#[derive(Debug, Clone)]
pub struct Sidecar {
    pub path: PathBuf,
    /// Capture time in UTC, if the sidecar carries one
    pub taken: Option<NaiveDateTime>,
}

impl Sidecar {
    /// Find and parse the sidecar of `media`, if there is one
    pub fn locate(media: &Path) -> Result<Option<Sidecar>, ImportError> {
        let by_stem = media.with_extension("json");
        let by_name = {
            let mut name = media.as_os_str().to_owned();
            name.push(".json");
            PathBuf::from(name)
        };

        let Some(path) = [by_stem, by_name].into_iter().find(|p| p.is_file()) else {
            return Ok(None);
        };

        let taken = Self::read_taken(&path)?;
        Ok(Some(Sidecar { path, taken }))
    }

    fn read_taken(path: &Path) -> Result<Option<NaiveDateTime>, ImportError> {
        let text = fs::read_to_string(path).map_err(|e| ImportError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        // Malformed sidecars are treated as carrying no date
        let metadata: TakeoutMetadata = match serde_json::from_str(&text) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable sidecar");
                return Ok(None);
            }
        };

        Ok(metadata
            .photo_taken_time
            .and_then(|t| t.timestamp.seconds())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.naive_utc()))
    }

    /// Copy into `<media dir>/_json/<media stem>.json`, returning the new path.
    pub fn copy_beside(&self, media: &Path) -> Result<PathBuf, ImportError> {
        let directory = media
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(SIDECAR_DIR);
        fs::create_dir_all(&directory).map_err(|e| ImportError::Sidecar {
            path: directory.clone(),
            source: e,
        })?;

        let stem = media
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let destination = unique_path(&directory.join(format!("{stem}.json")));

        fs::copy(&self.path, &destination).map_err(|e| ImportError::Sidecar {
            path: destination.clone(),
            source: e,
        })?;

        Ok(destination)
    }
}
