//! ONNX Runtime backend.
//!
//! Sessions are created lazily through the [`ModelRegistry`]. Each model is
//! fed its tensor as the first graph input and the first graph output is read
//! back as the score vector.

use super::registry::{ModelLoader, ModelRegistry};
use super::traits::{InferenceEngine, ModelId, ModelStatus, ScoreVector};
use super::ModelPaths;
use crate::core::tensor::Tensor;
use crate::error::InferenceError;
use crate::events::EventSender;
use ort::session::Session;
use ort::value::Tensor as OrtTensor;
use std::sync::Mutex;
use tracing::debug;

/// Builds ONNX sessions from model files on disk
pub struct OnnxLoader {
    paths: ModelPaths,
}

impl OnnxLoader {
    pub fn new(paths: ModelPaths) -> Self {
        Self { paths }
    }
}

impl ModelLoader for OnnxLoader {
    // Session::run needs exclusive access
    type Handle = Mutex<Session>;

    fn load(&self, model: ModelId) -> Result<Self::Handle, InferenceError> {
        let path = self.paths.path_for(model).to_path_buf();
        debug!(%model, path = %path.display(), "loading ONNX session");

        let session = Session::builder()
            .and_then(|builder| builder.commit_from_file(&path))
            .map_err(|e| InferenceError::ModelLoad {
                model,
                path: path.clone(),
                reason: e.to_string(),
            })?;

        Ok(Mutex::new(session))
    }
}

/// Inference engine backed by ONNX Runtime on the CPU
pub struct OnnxEngine {
    registry: ModelRegistry<OnnxLoader>,
}

impl OnnxEngine {
    pub fn new(paths: ModelPaths) -> Self {
        Self {
            registry: ModelRegistry::new(OnnxLoader::new(paths)),
        }
    }

    pub fn with_events(paths: ModelPaths, events: EventSender) -> Self {
        Self {
            registry: ModelRegistry::new(OnnxLoader::new(paths)).with_events(events),
        }
    }

    /// Load both sessions up front instead of on first use.
    ///
    /// Every model is attempted so [`InferenceEngine::status`] sees each
    /// failure; the first error is returned.
    pub fn warm_up(&self) -> Result<(), InferenceError> {
        let mut first_error = None;
        for model in ModelId::ALL {
            if let Err(e) = self.registry.get_or_load(model) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn registry(&self) -> &ModelRegistry<OnnxLoader> {
        &self.registry
    }
}

impl InferenceEngine for OnnxEngine {
    fn infer(&self, model: ModelId, tensor: &Tensor) -> Result<ScoreVector, InferenceError> {
        let execution = |reason: String| InferenceError::Execution { model, reason };

        let handle = self.registry.get_or_load(model)?;
        let mut session = handle
            .lock()
            .map_err(|_| execution("session lock poisoned".to_string()))?;

        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let input = OrtTensor::from_array((shape, tensor.data().to_vec()))
            .map_err(|e| execution(e.to_string()))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| execution(e.to_string()))?;

        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| execution(e.to_string()))?;

        ScoreVector::new(model, scores.to_vec())
    }

    fn reload(&self) -> Result<(), InferenceError> {
        self.registry.reload_all().map(|_| ())
    }

    fn status(&self) -> ModelStatus {
        self.registry.status()
    }
}
