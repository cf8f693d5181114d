//! Trait definitions for tensor preprocessing.

use crate::core::inference::ModelId;
use crate::core::raster::RasterImage;
use crate::core::tensor::Tensor;
use crate::error::PreconditionError;

/// Converts a raster into the tensor a specific classifier expects
pub trait Preprocessor: Send + Sync {
    /// Build the model input. Fails only on a malformed raster.
    fn preprocess(&self, raster: &RasterImage) -> Result<Tensor, PreconditionError>;

    /// The classifier this tensor is meant for
    fn model(&self) -> ModelId;
}
