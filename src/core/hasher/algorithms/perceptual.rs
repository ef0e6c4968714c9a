//! Perceptual Hash (pHash) over normalized pixels.
//!
//! The image is first normalized to a 256x256 RGB square, then handed to
//! image_hasher's DCT-preprocessed mean hash. The DCT keeps only the low
//! frequencies, which is what makes the result survive recompression,
//! re-encoding into another format, and metadata edits.

use super::super::fast_resize::{Normalizer, NORMALIZED_SIDE};
use super::super::traits::{Fingerprint, HashAlgorithm};
use crate::error::HashError;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig as ImageHasherConfig};

/// pHash over a fixed-size normalized image
pub struct PerceptualHasher {
    normalized_side: u32,
    hasher: image_hasher::Hasher,
}

impl PerceptualHasher {
    /// `hash_size` x `hash_size` bits, computed on a `normalized_side` square
    pub fn new(hash_size: u32, normalized_side: u32) -> Self {
        let hasher = ImageHasherConfig::new()
            .hash_size(hash_size, hash_size)
            .hash_alg(HashAlg::Mean)
            .preproc_dct()
            .to_hasher();

        Self {
            normalized_side,
            hasher,
        }
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new(8, NORMALIZED_SIDE)
    }
}

impl HashAlgorithm for PerceptualHasher {
    fn hash_image(&self, image: &DynamicImage) -> Result<Fingerprint, HashError> {
        let normalized = Normalizer::with_side(self.normalized_side).normalize(image)?;
        let hash = self.hasher.hash_image(&DynamicImage::ImageRgb8(normalized));

        Ok(Fingerprint::from_bytes(hash.as_bytes()))
    }

    fn name(&self) -> &'static str {
        "phash"
    }
}
