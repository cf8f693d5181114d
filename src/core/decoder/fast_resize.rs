//! Fast SIMD-accelerated image resizing.
//!
//! Uses fast_image_resize crate which is 5-14x faster than image crate's resize.
//! Automatically uses AVX2/NEON SIMD when available.

use crate::error::DecodeError;
use fast_image_resize::{images::Image, PixelType, ResizeOptions, Resizer};
use image::DynamicImage;

/// Fast image resizer using SIMD acceleration
pub struct FastResizer {
    resizer: Resizer,
}

impl FastResizer {
    /// Create a new fast resizer
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
        }
    }

    /// Stretch an image to `size x size` and return interleaved RGB bytes.
    ///
    /// The aspect ratio is not preserved: the whole source is mapped onto
    /// the square, with no cropping or letterboxing. Alpha is dropped.
    pub fn resize_to_rgb(&mut self, image: &DynamicImage, size: u32) -> Result<Vec<u8>, DecodeError> {
        let rgb = image.to_rgb8();

        let src_width = rgb.width();
        let src_height = rgb.height();

        if src_width == 0 || src_height == 0 {
            return Err(DecodeError::ZeroDimension {
                width: src_width,
                height: src_height,
            });
        }

        if size == 0 {
            return Err(DecodeError::Resize {
                size,
                reason: "Invalid destination dimensions".to_string(),
            });
        }

        if src_width == size && src_height == size {
            return Ok(rgb.into_raw());
        }

        let src_image = Image::from_vec_u8(src_width, src_height, rgb.into_raw(), PixelType::U8x3)
            .map_err(|e| DecodeError::Resize {
                size,
                reason: format!("Failed to create source image: {}", e),
            })?;

        let mut dst_image = Image::new(size, size, PixelType::U8x3);

        // Bilinear keeps the output deterministic for a given source
        let options = ResizeOptions::new().resize_alg(fast_image_resize::ResizeAlg::Convolution(
            fast_image_resize::FilterType::Bilinear,
        ));

        self.resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| DecodeError::Resize {
                size,
                reason: e.to_string(),
            })?;

        Ok(dst_image.into_vec())
    }
}

impl Default for FastResizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function for one-off resizing
pub fn resize_to_rgb(image: &DynamicImage, size: u32) -> Result<Vec<u8>, DecodeError> {
    let mut resizer = FastResizer::new();
    resizer.resize_to_rgb(image, size)
}
