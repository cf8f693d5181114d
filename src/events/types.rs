//! Event type definitions for progress reporting.

use crate::core::fusion::Verdict;
use crate::core::inference::ModelId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// All events emitted by the detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Per-request detection events
    Detection(DetectionEvent),
    /// Model session lifecycle
    Model(ModelEvent),
    /// Batch-level events
    Batch(BatchEvent),
}

/// Stages of a single detection request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionPhase {
    Decoding,
    Preprocessing,
    Inference,
    Fusion,
}

impl std::fmt::Display for DetectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionPhase::Decoding => write!(f, "Decoding image"),
            DetectionPhase::Preprocessing => write!(f, "Building tensors"),
            DetectionPhase::Inference => write!(f, "Running classifiers"),
            DetectionPhase::Fusion => write!(f, "Fusing verdict"),
        }
    }
}

/// Events during one detection request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DetectionEvent {
    /// A request has started
    Started { request_id: Uuid, bytes: usize },
    /// The request moved to a new stage
    PhaseChanged {
        request_id: Uuid,
        phase: DetectionPhase,
    },
    /// The request produced a verdict
    Completed {
        request_id: Uuid,
        verdict: Verdict,
        duration_ms: u64,
    },
    /// The request was aborted
    Failed { request_id: Uuid, message: String },
}

/// Model session lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelEvent {
    /// A model was loaded on first use
    Loaded { model: ModelId },
    /// A loaded model was replaced by a fresh load
    Reloaded { model: ModelId },
    /// A model was dropped from the registry
    Unloaded { model: ModelId },
}

/// Events while checking several images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BatchEvent {
    /// The batch has started
    Started { total_images: usize },
    /// Progress update
    Progress(BatchProgress),
    /// The batch finished
    Completed(BatchSummary),
}

/// Progress information during a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Images finished so far (success or failure)
    pub completed: usize,
    /// Total number of images
    pub total: usize,
    /// Images flagged as AI-generated so far
    pub flagged: usize,
    /// Image just finished
    pub current: String,
}

/// Summary of a finished batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_images: usize,
    pub flagged: usize,
    pub failed: usize,
    pub duration_ms: u64,
}
