//! # Preprocess Module
//!
//! Turns a decoded raster into the two classifier inputs.
//!
//! ## Variants
//! - **Normalized RGB** - ImageNet-standardized channels, planar layout
//! - **Residual Gray** - standardized high-frequency luma residual,
//!   replicated into three interleaved channels
//!
//! The two layouts differ on purpose: each matches what its paired model
//! was exported with.

pub mod kernel;
mod normalized;
mod residual;
mod traits;

pub use kernel::{BlurStrategy, GaussianKernel};
pub use normalized::{NormalizedRgbPreprocessor, IMAGENET_MEAN, IMAGENET_STD};
pub use residual::{grayscale, ResidualGrayPreprocessor, DEFAULT_KERNEL_SIZE, DEFAULT_SIGMA, STD_EPSILON};
pub use traits::Preprocessor;

use super::raster::RasterImage;
use super::tensor::Tensor;
use crate::error::PreconditionError;
use serde::{Deserialize, Serialize};

/// Residual blur configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Gaussian kernel side (odd)
    pub kernel_size: usize,
    /// Gaussian sigma
    pub sigma: f64,
    /// Convolution used for the blur
    pub blur: BlurStrategy,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            kernel_size: DEFAULT_KERNEL_SIZE,
            sigma: DEFAULT_SIGMA,
            blur: BlurStrategy::default(),
        }
    }
}

/// Both model inputs for one raster
#[derive(Debug, Clone)]
pub struct TensorPair {
    pub normalized: Tensor,
    pub residual: Tensor,
}

/// Runs both preprocessors over the same raster
#[derive(Debug, Clone)]
pub struct DualPreprocessor {
    normalized: NormalizedRgbPreprocessor,
    residual: ResidualGrayPreprocessor,
}

impl DualPreprocessor {
    pub fn new(config: &PreprocessConfig) -> Result<Self, PreconditionError> {
        Ok(Self {
            normalized: NormalizedRgbPreprocessor::new(),
            residual: ResidualGrayPreprocessor::with_kernel(config.kernel_size, config.sigma)?
                .strategy(config.blur),
        })
    }

    /// Build both tensors. They share no data, so they run concurrently.
    pub fn run(&self, raster: &RasterImage) -> Result<TensorPair, PreconditionError> {
        let (normalized, residual) = rayon::join(
            || self.normalized.preprocess(raster),
            || self.residual.preprocess(raster),
        );

        Ok(TensorPair {
            normalized: normalized?,
            residual: residual?,
        })
    }
}

impl Default for DualPreprocessor {
    fn default() -> Self {
        Self {
            normalized: NormalizedRgbPreprocessor::new(),
            residual: ResidualGrayPreprocessor::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tensor::TensorLayout;

    #[test]
    fn config_defaults_match_trained_blur() {
        let config = PreprocessConfig::default();
        assert_eq!(config.kernel_size, 5);
        assert_eq!(config.sigma, 1.2);
        assert_eq!(config.blur, BlurStrategy::Separable);
    }

    #[test]
    fn pair_has_both_layouts() {
        let raster = RasterImage::from_fn(224, |x, y| [(x % 256) as u8, (y % 256) as u8, 10]).unwrap();
        let pair = DualPreprocessor::default().run(&raster).unwrap();

        assert_eq!(pair.normalized.len(), 3 * 224 * 224);
        assert_eq!(pair.residual.len(), 3 * 224 * 224);
        assert_eq!(pair.normalized.layout(), TensorLayout::Planar);
        assert_eq!(pair.residual.layout(), TensorLayout::Interleaved);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PreprocessConfig {
            kernel_size: 6,
            ..PreprocessConfig::default()
        };
        assert!(DualPreprocessor::new(&config).is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: PreprocessConfig = serde_json::from_str(r#"{"blur": "direct"}"#).unwrap();
        assert_eq!(config.blur, BlurStrategy::Direct);
        assert_eq!(config.kernel_size, 5);
    }
}
