//! Trait definitions for external inference engines.

use crate::core::tensor::Tensor;
use crate::error::InferenceError;
use serde::{Deserialize, Serialize};

/// The two classifiers the detector consults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelId {
    /// ViT classifier fed ImageNet-normalized RGB
    NormalizedRgb,
    /// ResNet classifier fed the standardized noise residual
    ResidualGray,
}

impl ModelId {
    pub const ALL: [ModelId; 2] = [ModelId::NormalizedRgb, ModelId::ResidualGray];

    /// File name of the exported ONNX model
    pub fn default_file_name(&self) -> &'static str {
        match self {
            ModelId::NormalizedRgb => "binary_ViT.onnx",
            ModelId::ResidualGray => "binary_ReFor.onnx",
        }
    }

    /// Get a human-readable description of the model
    pub fn description(&self) -> &'static str {
        match self {
            ModelId::NormalizedRgb => "ViT classifier on ImageNet-normalized RGB",
            ModelId::ResidualGray => "Residual classifier on high-frequency luma noise",
        }
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelId::NormalizedRgb => write!(f, "normalized-rgb"),
            ModelId::ResidualGray => write!(f, "residual-gray"),
        }
    }
}

/// Class scores from one classifier: index 0 = real, index 1 = fake.
///
/// Values may be logits or probabilities; the fusion rule decides how to
/// read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector {
    scores: Vec<f32>,
}

impl ScoreVector {
    /// Validate raw engine output for `model`
    pub fn new(model: ModelId, scores: Vec<f32>) -> Result<Self, InferenceError> {
        if scores.len() < 2 {
            return Err(InferenceError::InvalidOutput {
                model,
                reason: format!("expected at least 2 scores, got {}", scores.len()),
            });
        }
        if let Some(bad) = scores.iter().find(|v| !v.is_finite()) {
            return Err(InferenceError::InvalidOutput {
                model,
                reason: format!("non-finite score {}", bad),
            });
        }
        Ok(Self { scores })
    }

    pub fn real(&self) -> f32 {
        self.scores[0]
    }

    pub fn fake(&self) -> f32 {
        self.scores[1]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.scores
    }
}

/// Which models an engine has ready, and which failed to load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelStatus {
    /// Models the detector needs
    pub total: usize,
    /// Models ready for inference, in a stable order
    pub loaded: Vec<ModelId>,
    /// Last load error per model that is not loaded
    pub failed: Vec<(ModelId, String)>,
}

impl ModelStatus {
    /// Every model loaded and nothing failed
    pub fn is_initialized(&self) -> bool {
        self.failed.is_empty() && self.loaded.len() == self.total
    }

    /// Status of an engine with no sessions to manage
    pub fn always_ready() -> Self {
        Self {
            total: ModelId::ALL.len(),
            loaded: ModelId::ALL.to_vec(),
            failed: Vec::new(),
        }
    }
}

/// An external model executor.
///
/// The detector treats engines as pure functions from tensor to scores.
/// Implementations must be callable from several threads at once.
pub trait InferenceEngine: Send + Sync {
    /// Run `model` on `tensor`
    fn infer(&self, model: ModelId, tensor: &Tensor) -> Result<ScoreVector, InferenceError>;

    /// Drop and reload any cached model sessions
    fn reload(&self) -> Result<(), InferenceError> {
        Ok(())
    }

    /// Report which models are ready. Engines without sessions are always ready.
    fn status(&self) -> ModelStatus {
        ModelStatus::always_ready()
    }
}

/// Adapts a closure into an [`InferenceEngine`]
pub struct FnEngine<F> {
    f: F,
}

impl<F> FnEngine<F>
where
    F: Fn(ModelId, &Tensor) -> Result<ScoreVector, InferenceError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> InferenceEngine for FnEngine<F>
where
    F: Fn(ModelId, &Tensor) -> Result<ScoreVector, InferenceError> + Send + Sync,
{
    fn infer(&self, model: ModelId, tensor: &Tensor) -> Result<ScoreVector, InferenceError> {
        (self.f)(model, tensor)
    }
}
