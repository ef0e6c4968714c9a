//! # Metadata Module
//!
//! Reads the capture date of a media file.
//!
//! Dates travel as EXIF-style strings, `"YYYY:MM:DD HH:MM:SS"`, so every
//! extractor agrees on one format regardless of where the date came from.
//! `DateTimeOriginal` is preferred; the plain `DateTime` tag is the
//! fallback, which is where some phones put the capture time of HEIC files.

use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// EXIF date format, `"YYYY:MM:DD HH:MM:SS"`
pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Source of capture dates
pub trait MetadataExtractor: Send + Sync {
    /// Capture date as `"YYYY:MM:DD HH:MM:SS"`, or `None` if unknown
    fn date_taken(&self, path: &Path) -> Option<String>;
}

/// Reads capture dates from embedded EXIF
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifExtractor;

impl MetadataExtractor for ExifExtractor {
    fn date_taken(&self, path: &Path) -> Option<String> {
        let file = File::open(path).ok()?;
        let mut bufreader = BufReader::new(&file);
        let exif = match Reader::new().read_from_container(&mut bufreader) {
            Ok(exif) => exif,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No readable EXIF");
                return None;
            }
        };

        [Tag::DateTimeOriginal, Tag::DateTime]
            .into_iter()
            .filter_map(|tag| exif.get_field(tag, In::PRIMARY))
            .filter_map(|field| ascii_value(&field.value))
            .find_map(|raw| normalize_exif_date(&raw))
    }
}

/// Re-serialize a date string, rejecting anything not in EXIF format
pub fn normalize_exif_date(raw: &str) -> Option<String> {
    parse_exif_date(raw).map(|dt| dt.format(EXIF_DATE_FORMAT).to_string())
}

pub fn parse_exif_date(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim_end_matches('\0').trim(), EXIF_DATE_FORMAT).ok()
}

fn ascii_value(value: &Value) -> Option<String> {
    if let Value::Ascii(ref vec) = value {
        let bytes = vec.first()?;
        let s = std::str::from_utf8(bytes).ok()?;
        let trimmed = s.trim_end_matches('\0').trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    None
}
