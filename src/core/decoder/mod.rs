//! # Decoder Module
//!
//! Turns opaque image bytes into a fixed-size RGB raster.
//!
//! ## How It Works
//! 1. Sniff the format from magic bytes
//! 2. Decode (zune-jpeg for JPEG, image crate for everything else)
//! 3. Stretch to `target_size x target_size` with a bilinear filter
//!
//! ## Example
//! ```rust,ignore
//! use ai_image_detector::core::decoder::{FastRasterDecoder, RasterDecoder};
//!
//! let decoder = FastRasterDecoder::new(224);
//! let raster = decoder.decode(&bytes)?;
//! assert_eq!(raster.size(), 224);
//! ```

pub mod fast_decode;
pub mod fast_resize;
pub mod mmap_read;

pub use fast_decode::{FastDecoder, ImageFormat};
pub use fast_resize::FastResizer;
pub use mmap_read::{read_file_bytes, FileBytes};

use super::raster::{check_target_size, RasterImage, DEFAULT_TARGET_SIZE};
use crate::error::DecodeError;
use tracing::debug;

/// Converts encoded image bytes into a square RGB raster
pub trait RasterDecoder: Send + Sync {
    /// Decode and resize. Must fail on empty, zero-sized or undecodable input.
    fn decode(&self, bytes: &[u8]) -> Result<RasterImage, DecodeError>;

    /// Edge length of the rasters this decoder produces
    fn target_size(&self) -> u32;
}

/// Default decoder: fast per-format decode followed by SIMD resize
#[derive(Debug, Clone)]
pub struct FastRasterDecoder {
    target_size: u32,
}

impl FastRasterDecoder {
    pub fn new(target_size: u32) -> Self {
        Self { target_size }
    }
}

impl Default for FastRasterDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_SIZE)
    }
}

impl RasterDecoder for FastRasterDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<RasterImage, DecodeError> {
        check_target_size(self.target_size).map_err(|e| DecodeError::Resize {
            size: self.target_size,
            reason: e.to_string(),
        })?;
        let image = FastDecoder::decode(bytes)?;

        debug!(
            width = image.width(),
            height = image.height(),
            target = self.target_size,
            "decoded source image"
        );

        let pixels = FastResizer::new().resize_to_rgb(&image, self.target_size)?;

        RasterImage::from_rgb(self.target_size, pixels).map_err(|e| DecodeError::Resize {
            size: self.target_size,
            reason: e.to_string(),
        })
    }

    fn target_size(&self) -> u32 {
        self.target_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat as EncodeFormat, Rgb};
    use std::io::Cursor;

    fn encode(width: u32, height: u32, format: EncodeFormat) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 64])
        });
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }

    #[test]
    fn png_decodes_to_target_size() {
        let decoder = FastRasterDecoder::default();
        let raster = decoder.decode(&encode(320, 240, EncodeFormat::Png)).unwrap();

        assert_eq!(raster.size(), 224);
        assert_eq!(raster.as_bytes().len(), 224 * 224 * 3);
    }

    #[test]
    fn jpeg_decodes_to_target_size() {
        let decoder = FastRasterDecoder::new(64);
        let raster = decoder.decode(&encode(100, 30, EncodeFormat::Jpeg)).unwrap();

        assert_eq!(raster.size(), 64);
    }

    #[test]
    fn decoding_is_deterministic() {
        let decoder = FastRasterDecoder::new(32);
        let bytes = encode(90, 45, EncodeFormat::Png);

        assert_eq!(decoder.decode(&bytes).unwrap(), decoder.decode(&bytes).unwrap());
    }

    #[test]
    fn undecodable_bytes_fail() {
        let decoder = FastRasterDecoder::default();
        assert!(decoder.decode(b"definitely not an image").is_err());
        assert!(matches!(decoder.decode(&[]), Err(DecodeError::Empty)));
    }

    #[test]
    fn oversized_target_fails_before_decoding() {
        let decoder = FastRasterDecoder::new(100_000);
        let err = decoder.decode(&encode(8, 8, EncodeFormat::Png)).unwrap_err();

        assert!(matches!(err, DecodeError::Resize { size: 100_000, .. }));
    }
}
