//! Normalized RGB preprocessing (ViT-style).
//!
//! Each channel is scaled to `[0, 1]` and standardized with the ImageNet
//! mean and standard deviation, then written channel-planar.

use super::traits::Preprocessor;
use crate::core::inference::ModelId;
use crate::core::raster::RasterImage;
use crate::core::tensor::{Tensor, TensorLayout};
use crate::error::PreconditionError;

/// ImageNet channel means (R, G, B)
pub const IMAGENET_MEAN: [f64; 3] = [0.485, 0.456, 0.406];
/// ImageNet channel standard deviations (R, G, B)
pub const IMAGENET_STD: [f64; 3] = [0.229, 0.224, 0.225];

/// Produces the planar `[1, 3, size, size]` input of the ViT classifier
#[derive(Debug, Clone)]
pub struct NormalizedRgbPreprocessor {
    mean: [f64; 3],
    std: [f64; 3],
}

impl NormalizedRgbPreprocessor {
    pub fn new() -> Self {
        Self {
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }
}

impl Default for NormalizedRgbPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor for NormalizedRgbPreprocessor {
    fn preprocess(&self, raster: &RasterImage) -> Result<Tensor, PreconditionError> {
        raster.validate()?;

        let plane = raster.pixel_count();
        let mut data = vec![0.0f32; plane * 3];

        for (i, pixel) in raster.pixels().enumerate() {
            for c in 0..3 {
                let scaled = pixel[c] as f64 / 255.0;
                data[c * plane + i] = ((scaled - self.mean[c]) / self.std[c]) as f32;
            }
        }

        Tensor::image(data, raster.size(), TensorLayout::Planar)
    }

    fn model(&self) -> ModelId {
        ModelId::NormalizedRgb
    }
}
