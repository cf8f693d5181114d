//! Detection pipeline execution.

use super::config::DetectorConfig;
use crate::core::decoder::{read_file_bytes, FastRasterDecoder, RasterDecoder};
use crate::core::fusion::{fuse, FusionConfig, FusionOutcome, Verdict};
use crate::core::inference::{InferenceEngine, ModelId, ModelStatus, ScoreVector};
use crate::core::preprocess::{DualPreprocessor, PreprocessConfig, TensorPair};
use crate::error::DetectError;
use crate::events::{
    null_sender, BatchEvent, BatchProgress, BatchSummary, DetectionEvent, DetectionPhase, Event,
    EventSender,
};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Full result of one detection request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub request_id: Uuid,
    pub verdict: Verdict,
    pub outcome: FusionOutcome,
    /// Scores exactly as the engines returned them
    pub normalized_scores: ScoreVector,
    pub residual_scores: ScoreVector,
    pub detected_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Result of checking several files
#[derive(Debug)]
pub struct BatchResult {
    /// One entry per input, in input order
    pub items: Vec<(PathBuf, Result<Detection, DetectError>)>,
    pub duration_ms: u64,
}

impl BatchResult {
    pub fn flagged(&self) -> usize {
        self.items
            .iter()
            .filter(|(_, r)| matches!(r, Ok(d) if d.verdict.is_ai))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items.iter().filter(|(_, r)| r.is_err()).count()
    }

    /// True when there was input and none of it produced a verdict
    pub fn all_failed(&self) -> bool {
        !self.items.is_empty() && self.failed() == self.items.len()
    }
}

/// Builder for [`Detector`]
pub struct DetectorBuilder {
    config: DetectorConfig,
    decoder: Option<Box<dyn RasterDecoder>>,
}

impl DetectorBuilder {
    pub fn new() -> Self {
        Self {
            config: DetectorConfig::default(),
            decoder: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: DetectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the raster edge length
    pub fn target_size(mut self, size: u32) -> Self {
        self.config.target_size = size;
        self
    }

    /// Set the residual blur settings
    pub fn preprocess(mut self, preprocess: PreprocessConfig) -> Self {
        self.config.preprocess = preprocess;
        self
    }

    /// Set how score vectors are fused
    pub fn fusion(mut self, fusion: FusionConfig) -> Self {
        self.config.fusion = fusion;
        self
    }

    /// Use a custom decoder instead of the built-in one
    pub fn decoder(mut self, decoder: Box<dyn RasterDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Build the detector around `engine`
    pub fn build(self, engine: Arc<dyn InferenceEngine>) -> Result<Detector, DetectError> {
        self.config.validate()?;
        let preprocessor = DualPreprocessor::new(&self.config.preprocess)?;
        let decoder = self
            .decoder
            .unwrap_or_else(|| Box::new(FastRasterDecoder::new(self.config.target_size)));

        Ok(Detector {
            config: self.config,
            decoder,
            preprocessor,
            engine,
        })
    }
}

impl Default for DetectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decides whether images are AI-generated.
///
/// Holds no per-request state, so one detector can serve many threads.
pub struct Detector {
    config: DetectorConfig,
    decoder: Box<dyn RasterDecoder>,
    preprocessor: DualPreprocessor,
    engine: Arc<dyn InferenceEngine>,
}

impl Detector {
    pub fn builder() -> DetectorBuilder {
        DetectorBuilder::new()
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Classify encoded image bytes
    pub fn detect(&self, bytes: &[u8]) -> Result<Verdict, DetectError> {
        self.detect_detailed(bytes).map(|d| d.verdict)
    }

    /// Classify encoded image bytes, keeping per-model detail
    pub fn detect_detailed(&self, bytes: &[u8]) -> Result<Detection, DetectError> {
        self.detect_with_events(bytes, &null_sender())
    }

    /// Classify encoded image bytes, reporting each stage on `events`.
    ///
    /// Any stage failure aborts the request; nothing partial is returned.
    pub fn detect_with_events(
        &self,
        bytes: &[u8],
        events: &EventSender,
    ) -> Result<Detection, DetectError> {
        let request_id = Uuid::new_v4();
        let start_time = Instant::now();

        events.send(Event::Detection(DetectionEvent::Started {
            request_id,
            bytes: bytes.len(),
        }));

        let result = self.run_stages(request_id, bytes, events, start_time);

        match &result {
            Ok(detection) => {
                info!(%request_id, label = %detection.verdict.label, duration_ms = detection.duration_ms, "detection complete");
                events.send(Event::Detection(DetectionEvent::Completed {
                    request_id,
                    verdict: detection.verdict,
                    duration_ms: detection.duration_ms,
                }));
            }
            Err(e) => {
                warn!(%request_id, error = %e, "detection failed");
                events.send(Event::Detection(DetectionEvent::Failed {
                    request_id,
                    message: e.to_string(),
                }));
            }
        }

        result
    }

    /// Read a file (memory-mapped when large) and classify it
    pub fn detect_file(&self, path: &Path) -> Result<Detection, DetectError> {
        self.detect_file_with_events(path, &null_sender())
    }

    fn detect_file_with_events(
        &self,
        path: &Path,
        events: &EventSender,
    ) -> Result<Detection, DetectError> {
        let bytes = read_file_bytes(path)?;
        self.detect_with_events(&bytes, events)
    }

    /// Classify many files in parallel.
    ///
    /// Failures are recorded per file and do not stop the batch.
    pub fn detect_batch(&self, paths: &[PathBuf], events: &EventSender) -> BatchResult {
        let start_time = Instant::now();
        let total = paths.len();
        let completed = AtomicUsize::new(0);
        let flagged = AtomicUsize::new(0);

        events.send(Event::Batch(BatchEvent::Started {
            total_images: total,
        }));

        let items: Vec<(PathBuf, Result<Detection, DetectError>)> = paths
            .par_iter()
            .map(|path| {
                let result = self.detect_file_with_events(path, events);

                if matches!(&result, Ok(d) if d.verdict.is_ai) {
                    flagged.fetch_add(1, Ordering::SeqCst);
                }
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;

                events.send(Event::Batch(BatchEvent::Progress(BatchProgress {
                    completed: done,
                    total,
                    flagged: flagged.load(Ordering::SeqCst),
                    current: path.display().to_string(),
                })));

                (path.clone(), result)
            })
            .collect();

        let result = BatchResult {
            items,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        events.send(Event::Batch(BatchEvent::Completed(BatchSummary {
            total_images: total,
            flagged: result.flagged(),
            failed: result.failed(),
            duration_ms: result.duration_ms,
        })));

        result
    }

    /// Drop and reload the engine's model sessions
    pub fn reload_models(&self) -> Result<(), DetectError> {
        self.engine.reload()?;
        Ok(())
    }

    /// Which models are loaded and which failed to load
    pub fn model_status(&self) -> ModelStatus {
        self.engine.status()
    }

    fn run_stages(
        &self,
        request_id: Uuid,
        bytes: &[u8],
        events: &EventSender,
        start_time: Instant,
    ) -> Result<Detection, DetectError> {
        let phase = |phase| {
            events.send(Event::Detection(DetectionEvent::PhaseChanged { request_id, phase }));
        };

        phase(DetectionPhase::Decoding);
        let raster = self.decoder.decode(bytes)?;

        phase(DetectionPhase::Preprocessing);
        let TensorPair {
            normalized,
            residual,
        } = self.preprocessor.run(&raster)?;
        drop(raster);

        phase(DetectionPhase::Inference);
        let (normalized_scores, residual_scores) = rayon::join(
            || self.engine.infer(ModelId::NormalizedRgb, &normalized),
            || self.engine.infer(ModelId::ResidualGray, &residual),
        );
        let normalized_scores = normalized_scores?;
        let residual_scores = residual_scores?;
        debug!(
            %request_id,
            normalized = ?normalized_scores.as_slice(),
            residual = ?residual_scores.as_slice(),
            "classifier scores"
        );

        phase(DetectionPhase::Fusion);
        let outcome = fuse(&normalized_scores, &residual_scores, &self.config.fusion);

        Ok(Detection {
            request_id,
            verdict: outcome.verdict,
            outcome,
            normalized_scores,
            residual_scores,
            detected_at: Utc::now(),
            duration_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}

/// Convenience: build a detector with default settings around `engine`
pub fn detector_with_engine(engine: Arc<dyn InferenceEngine>) -> Result<Detector, DetectError> {
    Detector::builder().build(engine)
}
