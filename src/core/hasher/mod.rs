//! # Hasher Module
//!
//! Computes perceptual fingerprints of image content.
//!
//! ## How It Works
//! 1. Decode (zune-jpeg for JPEG, image crate otherwise)
//! 2. Convert to RGB and resample to 256x256 (Lanczos3)
//! 3. DCT-based perceptual hash, 64 bits
//! 4. Render as 16 lowercase hex characters
//!
//! Two files whose normalized pixels match get the same fingerprint no
//! matter their name, container format, or EXIF block.
//!
//! ## Example
//! ```rust,ignore
//! use media_vault::core::hasher::HasherConfig;
//!
//! let hasher = HasherConfig::new().build();
//! let fingerprint = hasher.hash_file(&path)?;
//! ```

mod algorithms;
mod cached;
pub mod fast_decode;
pub mod fast_resize;
mod traits;

pub use algorithms::PerceptualHasher;
pub use cached::{CachePolicy, CachedFingerprinter, Fingerprinted};
pub use traits::{Fingerprint, HashAlgorithm};

use fast_resize::NORMALIZED_SIDE;

/// Configuration builder for hashers
#[derive(Debug, Clone)]
pub struct HasherConfig {
    /// Bits per side of the hash grid (8 gives a 64-bit hash)
    hash_size: u32,
    /// Side of the square every image is resampled to
    normalized_side: u32,
}

impl HasherConfig {
    pub fn new() -> Self {
        Self {
            hash_size: 8,
            normalized_side: NORMALIZED_SIDE,
        }
    }

    /// Larger sizes distinguish more images but tolerate less recompression.
    /// Changing it invalidates every fingerprint already in a store.
    pub fn hash_size(mut self, size: u32) -> Self {
        self.hash_size = size;
        self
    }

    pub fn normalized_side(mut self, side: u32) -> Self {
        self.normalized_side = side;
        self
    }

    pub fn build(self) -> Box<dyn HashAlgorithm> {
        Box::new(PerceptualHasher::new(self.hash_size, self.normalized_side))
    }
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    fn checkerboard() -> image::RgbImage {
        ImageBuffer::from_fn(96, 64, |x, y| {
            if (x / 16 + y / 16) % 2 == 0 {
                Rgb([250, 250, 250])
            } else {
                Rgb([10, 10, 10])
            }
        })
    }

    #[test]
    fn config_defaults() {
        let config = HasherConfig::new();
        assert_eq!(config.hash_size, 8);
        assert_eq!(config.normalized_side, 256);
    }

    #[test]
    fn built_hasher_is_phash() {
        assert_eq!(HasherConfig::new().build().name(), "phash");
    }

    #[test]
    fn same_pixels_in_different_containers_match() {
        let temp_dir = TempDir::new().unwrap();
        let png = temp_dir.path().join("shot.png");
        let bmp = temp_dir.path().join("shot-copy.bmp");
        checkerboard().save(&png).unwrap();
        checkerboard().save(&bmp).unwrap();

        let hasher = HasherConfig::new().build();

        assert_eq!(
            hasher.hash_file(&png).unwrap(),
            hasher.hash_file(&bmp).unwrap()
        );
    }
}
