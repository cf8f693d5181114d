//! # Core Module
//!
//! The UI-agnostic detection engine.
//!
//! ## Modules
//! - `decoder` - Turns encoded bytes into a fixed-size RGB raster
//! - `preprocess` - Builds the two classifier input tensors
//! - `inference` - Classifier engines and the model session registry
//! - `fusion` - Combines two score vectors into a verdict
//! - `pipeline` - Orchestrates the full workflow

pub mod decoder;
pub mod fusion;
pub mod inference;
pub mod pipeline;
pub mod preprocess;
pub mod raster;
pub mod tensor;

// Re-export commonly used types
pub use fusion::{FusionConfig, FusionOutcome, Label, ScoreInterpretation, Verdict};
pub use inference::{InferenceEngine, ModelId, ModelPaths, ScoreVector};
pub use pipeline::{Detection, Detector, DetectorConfig};
pub use raster::RasterImage;
pub use tensor::{Tensor, TensorLayout};
