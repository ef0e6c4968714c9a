//! Fixed-size color normalization before fingerprinting.
//!
//! Every image is converted to 8-bit RGB and resampled to a square with a
//! Lanczos3 filter. Recompression noise and metadata differences mostly
//! vanish at that resolution, so two encodings of the same picture land on
//! the same pixels before the hash sees them.
//!
//! Uses fast_image_resize (SIMD when available) instead of `image`'s resize.

use crate::error::HashError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};

/// Side length of the normalized square
pub const NORMALIZED_SIDE: u32 = 256;

/// Resamples images to a fixed RGB square
pub struct Normalizer {
    resizer: Resizer,
    side: u32,
}

impl Normalizer {
    /// Normalizer for `NORMALIZED_SIDE` x `NORMALIZED_SIDE`
    pub fn new() -> Self {
        Self::with_side(NORMALIZED_SIDE)
    }

    pub fn with_side(side: u32) -> Self {
        Self {
            resizer: Resizer::new(),
            side,
        }
    }

    /// Convert to RGB8 and resample to `side` x `side`.
    ///
    /// Aspect ratio is not preserved; only the pixel content matters.
    pub fn normalize(&mut self, image: &DynamicImage) -> Result<RgbImage, HashError> {
        let rgb = image.to_rgb8();
        let (src_width, src_height) = rgb.dimensions();

        if src_width == 0 || src_height == 0 {
            return Err(HashError::NormalizeFailed(
                "source image has no pixels".to_string(),
            ));
        }
        if self.side == 0 {
            return Err(HashError::NormalizeFailed(
                "normalized side must be positive".to_string(),
            ));
        }

        let src_image =
            Image::from_vec_u8(src_width, src_height, rgb.into_raw(), PixelType::U8x3).map_err(
                |e| HashError::NormalizeFailed(format!("Failed to wrap source pixels: {}", e)),
            )?;

        let mut dst_image = Image::new(self.side, self.side, PixelType::U8x3);

        let options =
            ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));

        self.resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| HashError::NormalizeFailed(format!("Resize failed: {}", e)))?;

        let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_raw(self.side, self.side, dst_image.into_vec()).ok_or_else(|| {
                HashError::NormalizeFailed("Failed to rebuild RGB buffer".to_string())
            })?;

        Ok(buffer)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                ((x + y) * 128 / (width + height).max(1)) as u8,
            ])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn output_is_fixed_square() {
        let mut normalizer = Normalizer::new();
        let out = normalizer.normalize(&gradient(640, 480)).unwrap();
        assert_eq!(out.dimensions(), (256, 256));
    }

    #[test]
    fn upsamples_small_images() {
        let mut normalizer = Normalizer::new();
        let out = normalizer.normalize(&gradient(10, 30)).unwrap();
        assert_eq!(out.dimensions(), (256, 256));
    }

    #[test]
    fn grayscale_input_becomes_rgb() {
        let gray: GrayImage = ImageBuffer::from_fn(64, 64, |x, _| Luma([(x * 4) as u8]));
        let mut normalizer = Normalizer::with_side(32);

        let out = normalizer.normalize(&DynamicImage::ImageLuma8(gray)).unwrap();

        let pixel = out.get_pixel(16, 16);
        assert_eq!(pixel[0], pixel[1]);
        assert_eq!(pixel[1], pixel[2]);
    }

    #[test]
    fn normalization_is_deterministic() {
        let mut normalizer = Normalizer::new();
        let image = gradient(300, 200);

        let first = normalizer.normalize(&image).unwrap();
        let second = normalizer.normalize(&image).unwrap();

        assert_eq!(first.as_raw(), second.as_raw());
    }
}
