//! Residual gray preprocessing for the noise-residual classifier.
//!
//! ## How It Works
//! 1. Convert to BT.601 luma (floating point, no rounding)
//! 2. Blur with a normalized Gaussian, clamping at the edges
//! 3. Subtract the blur to keep only high-frequency texture
//! 4. Standardize with the population mean and `std + 1e-6`
//! 5. Write each value three times, interleaved

use super::kernel::{BlurStrategy, GaussianKernel};
use super::traits::Preprocessor;
use crate::core::inference::ModelId;
use crate::core::raster::RasterImage;
use crate::core::tensor::{Tensor, TensorLayout};
use crate::error::PreconditionError;

/// Default blur kernel side
pub const DEFAULT_KERNEL_SIZE: usize = 5;
/// Default blur sigma
pub const DEFAULT_SIGMA: f64 = 1.2;
/// Added to the standard deviation so a flat image does not divide by zero
pub const STD_EPSILON: f64 = 1e-6;

/// BT.601 luma of every pixel
pub fn grayscale(raster: &RasterImage) -> Vec<f32> {
    raster
        .pixels()
        .map(|[r, g, b]| (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) as f32)
        .collect()
}

/// Produces the interleaved `[1, 3, size, size]` input of the residual classifier
#[derive(Debug, Clone)]
pub struct ResidualGrayPreprocessor {
    kernel: GaussianKernel,
    strategy: BlurStrategy,
}

impl ResidualGrayPreprocessor {
    /// Preprocessor with the 5x5, sigma 1.2 blur the classifier was trained with
    pub fn new() -> Self {
        Self {
            kernel: GaussianKernel::from_valid(DEFAULT_KERNEL_SIZE, DEFAULT_SIGMA),
            strategy: BlurStrategy::default(),
        }
    }

    pub fn with_kernel(kernel_size: usize, sigma: f64) -> Result<Self, PreconditionError> {
        Ok(Self {
            kernel: GaussianKernel::new(kernel_size, sigma)?,
            strategy: BlurStrategy::default(),
        })
    }

    pub fn strategy(mut self, strategy: BlurStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn kernel(&self) -> &GaussianKernel {
        &self.kernel
    }

    /// `gray - blur(gray)` for the whole raster
    pub fn residual(&self, raster: &RasterImage) -> Result<Vec<f32>, PreconditionError> {
        raster.validate()?;
        let side = raster.size() as usize;
        let gray = grayscale(raster);
        let blur = self.strategy.apply(&self.kernel, &gray, side);

        Ok(gray.iter().zip(&blur).map(|(g, b)| g - b).collect())
    }
}

impl Default for ResidualGrayPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Standardize in place with population statistics
fn standardize(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let std_eff = variance.sqrt() + STD_EPSILON;

    for v in values.iter_mut() {
        *v = ((*v as f64 - mean) / std_eff) as f32;
    }
}

impl Preprocessor for ResidualGrayPreprocessor {
    fn preprocess(&self, raster: &RasterImage) -> Result<Tensor, PreconditionError> {
        let mut residual = self.residual(raster)?;
        standardize(&mut residual);

        let mut data = Vec::with_capacity(residual.len() * 3);
        for v in residual {
            data.extend_from_slice(&[v, v, v]);
        }

        Tensor::image(data, raster.size(), TensorLayout::Interleaved)
    }

    fn model(&self) -> ModelId {
        ModelId::ResidualGray
    }
}
