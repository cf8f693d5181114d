//! # Inference Module
//!
//! The seam between the detector and the neural networks it consults.
//!
//! The networks themselves are external: the detector only needs something
//! implementing [`InferenceEngine`]. With the `onnx` feature enabled,
//! [`OnnxEngine`] runs the exported models through ONNX Runtime, keeping
//! sessions in a [`ModelRegistry`] that loads lazily and supports reloads.

#[cfg(feature = "onnx")]
mod onnx;
mod registry;
mod traits;

#[cfg(feature = "onnx")]
pub use onnx::{OnnxEngine, OnnxLoader};
pub use registry::{ModelLoader, ModelRegistry};
pub use traits::{FnEngine, InferenceEngine, ModelId, ModelStatus, ScoreVector};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the two model files live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPaths {
    pub normalized_rgb: PathBuf,
    pub residual_gray: PathBuf,
}

impl ModelPaths {
    /// Both models under `dir` with their default file names
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            normalized_rgb: dir.join(ModelId::NormalizedRgb.default_file_name()),
            residual_gray: dir.join(ModelId::ResidualGray.default_file_name()),
        }
    }

    /// Platform data directory, e.g. `~/.local/share/ai-image-detector/models`
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ai-image-detector")
            .join("models")
    }

    pub fn path_for(&self, model: ModelId) -> &Path {
        match model {
            ModelId::NormalizedRgb => &self.normalized_rgb,
            ModelId::ResidualGray => &self.residual_gray,
        }
    }
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self::in_dir(&Self::default_dir())
    }
}
