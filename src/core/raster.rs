//! Fixed-size RGB raster produced by the decoder.

use crate::error::PreconditionError;

/// Default square edge length fed to both classifiers
pub const DEFAULT_TARGET_SIZE: u32 = 224;

/// Largest accepted edge length; keeps `size * size * 3` allocations bounded
pub const MAX_TARGET_SIZE: u32 = 4096;

/// Reject edge lengths no raster can be built with
pub fn check_target_size(size: u32) -> Result<(), PreconditionError> {
    if size == 0 {
        return Err(PreconditionError::ZeroTargetSize);
    }
    if size > MAX_TARGET_SIZE {
        return Err(PreconditionError::TargetSizeTooLarge {
            size,
            max: MAX_TARGET_SIZE,
        });
    }
    Ok(())
}

/// A square RGB raster with 8-bit samples, row-major and interleaved (`RGBRGB...`).
///
/// Immutable once built; each detection request owns its own raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    size: u32,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// Wrap an interleaved RGB buffer of `size * size * 3` bytes
    pub fn from_rgb(size: u32, pixels: Vec<u8>) -> Result<Self, PreconditionError> {
        check_target_size(size)?;
        let expected = Self::byte_len(size);
        if pixels.len() != expected {
            return Err(PreconditionError::RasterLength {
                size,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self { size, pixels })
    }

    /// Build a raster by evaluating `f(x, y)` for every pixel
    pub fn from_fn<F>(size: u32, mut f: F) -> Result<Self, PreconditionError>
    where
        F: FnMut(u32, u32) -> [u8; 3],
    {
        check_target_size(size)?;
        let mut pixels = Vec::with_capacity(Self::byte_len(size));
        for y in 0..size {
            for x in 0..size {
                pixels.extend_from_slice(&f(x, y));
            }
        }
        Ok(Self { size, pixels })
    }

    /// A raster filled with a single color
    pub fn solid(size: u32, rgb: [u8; 3]) -> Result<Self, PreconditionError> {
        Self::from_fn(size, |_, _| rgb)
    }

    /// Edge length in pixels
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of pixels (`size * size`)
    pub fn pixel_count(&self) -> usize {
        (self.size as usize) * (self.size as usize)
    }

    /// Raw interleaved RGB bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Iterate pixels in row-major order
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.pixels.chunks_exact(3).map(|p| [p[0], p[1], p[2]])
    }

    /// Re-check the length invariant.
    ///
    /// Rasters built through the constructors always pass; preprocessors
    /// call this before indexing so a bad buffer surfaces as an error.
    pub fn validate(&self) -> Result<(), PreconditionError> {
        check_target_size(self.size)?;
        let expected = Self::byte_len(self.size);
        if self.pixels.len() != expected {
            return Err(PreconditionError::RasterLength {
                size: self.size,
                expected,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }

    fn byte_len(size: u32) -> usize {
        (size as usize) * (size as usize) * 3
    }
}
