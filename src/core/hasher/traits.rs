//! Trait definitions for perceptual hashing.

use super::fast_decode::FastDecoder;
use crate::error::HashError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Canonical fingerprint of an image's pixel content.
///
/// Always lowercase hex, so it can be stored and compared as plain text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Encode raw hash bits as a fingerprint
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    /// Wrap a fingerprint read back from the store
    pub fn from_stored(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hamming distance to another fingerprint of the same length.
    ///
    /// Only used for reporting how close two images are; duplicate
    /// classification is exact equality.
    pub fn distance(&self, other: &Self) -> Option<u32> {
        if self.0.len() != other.0.len() {
            return None;
        }

        self.0
            .chars()
            .zip(other.0.chars())
            .map(|(a, b)| Some((a.to_digit(16)? ^ b.to_digit(16)?).count_ones()))
            .sum()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for fingerprint algorithms
pub trait HashAlgorithm: Send + Sync {
    /// Fingerprint an already-decoded image
    fn hash_image(&self, image: &DynamicImage) -> Result<Fingerprint, HashError>;

    /// Decode and fingerprint a file
    fn hash_file(&self, path: &Path) -> Result<Fingerprint, HashError> {
        let image = FastDecoder::decode(path)?;
        self.hash_image(&image)
    }

    /// Short algorithm name for logs
    fn name(&self) -> &'static str;
}
