//! Fast image decoding with format-specific optimizations.
//!
//! Uses zune-jpeg for JPEG data (1.5-2x faster than image crate),
//! falls back to image crate for other formats.

use crate::error::DecodeError;
use image::{DynamicImage, ImageBuffer, ImageError, Luma, Rgb, Rgba};
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// Image formats recognized from magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    Tiff,
    Unknown,
}

impl ImageFormat {
    /// Sniff the format from the leading bytes.
    ///
    /// Checking magic bytes is much cheaper than attempting a full decode.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }
        if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Self::Png;
        }
        if bytes.starts_with(b"GIF8") {
            return Self::Gif;
        }
        if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
            return Self::WebP;
        }
        if bytes.starts_with(&[0x42, 0x4D]) {
            return Self::Bmp;
        }
        // Little endian or big endian TIFF
        if bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
        {
            return Self::Tiff;
        }
        Self::Unknown
    }
}

/// Fast image decoder that uses optimized decoders per format
pub struct FastDecoder;

impl FastDecoder {
    /// Decode in-memory image data using the fastest available decoder.
    ///
    /// - JPEG: Uses zune-jpeg (1.5-2x faster)
    /// - Other formats: Falls back to image crate
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        match ImageFormat::from_bytes(bytes) {
            ImageFormat::Jpeg => Self::decode_jpeg(bytes).or_else(|_| Self::decode_fallback(bytes)),
            _ => Self::decode_fallback(bytes),
        }
    }

    /// Fast JPEG decoding using zune-jpeg
    fn decode_jpeg(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
        let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB);
        let mut decoder = JpegDecoder::new_with_options(bytes, options);

        let pixels = decoder.decode().map_err(|e| DecodeError::Malformed {
            reason: format!("zune-jpeg decode failed: {:?}", e),
        })?;

        let info = decoder.info().ok_or_else(|| DecodeError::Malformed {
            reason: "Failed to get image info".to_string(),
        })?;

        let width = info.width as u32;
        let height = info.height as u32;

        let out_colorspace = decoder.get_output_colorspace().unwrap_or(ColorSpace::RGB);

        let image = match out_colorspace {
            ColorSpace::RGB => {
                let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| {
                        DecodeError::Malformed {
                            reason: "Failed to create RGB buffer".to_string(),
                        }
                    })?;
                DynamicImage::ImageRgb8(buffer)
            }
            ColorSpace::RGBA => {
                let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| {
                        DecodeError::Malformed {
                            reason: "Failed to create RGBA buffer".to_string(),
                        }
                    })?;
                DynamicImage::ImageRgba8(buffer)
            }
            ColorSpace::Luma => {
                let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| {
                        DecodeError::Malformed {
                            reason: "Failed to create Luma buffer".to_string(),
                        }
                    })?;
                DynamicImage::ImageLuma8(buffer)
            }
            _ => return Self::decode_fallback(bytes),
        };

        Ok(image)
    }

    /// Fallback to image crate, which guesses the format itself
    fn decode_fallback(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
        image::load_from_memory(bytes).map_err(|e| match e {
            ImageError::Unsupported(_) => DecodeError::UnsupportedFormat,
            other => DecodeError::Malformed {
                reason: other.to_string(),
            },
        })
    }
}
