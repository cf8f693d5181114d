//! # Error Module
//!
//! Error types for the AI image detector.
//!
//! ## Design Principles
//! - **Never panic** on caller data - return errors instead
//! - **Include context** - model, dimensions, what went wrong
//! - **Fail the whole request** - any stage error aborts detection
//! - **No retries here** - retry policy belongs to the calling layer

use crate::core::inference::ModelId;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level detection error
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Decoding error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Precondition violated: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("All {total} images failed to process")]
    BatchFailed { total: usize },
}

/// Errors that occur while turning bytes into a raster
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Image data is empty")]
    Empty,

    #[error("Unsupported or unrecognized image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {reason}")]
    Malformed { reason: String },

    #[error("Image has zero dimensions ({width}x{height})")]
    ZeroDimension { width: u32, height: u32 },

    #[error("Resize to {size}x{size} failed: {reason}")]
    Resize { size: u32, reason: String },

    #[error("Failed to read image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Malformed data handed between internal stages.
///
/// These indicate a caller or implementation bug, not a runtime condition.
#[derive(Error, Debug, PartialEq)]
pub enum PreconditionError {
    #[error("Raster buffer holds {actual} bytes, expected {expected} for {size}x{size} RGB")]
    RasterLength {
        size: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Tensor holds {actual} values, shape {shape:?} requires {expected}")]
    TensorLength {
        shape: [usize; 4],
        expected: usize,
        actual: usize,
    },

    #[error("Gaussian kernel size must be odd and at least 1, got {0}")]
    KernelSize(usize),

    #[error("Gaussian sigma must be positive and finite, got {0}")]
    KernelSigma(f64),

    #[error("Target size must be non-zero")]
    ZeroTargetSize,

    #[error("Target size {size} exceeds the maximum of {max}")]
    TargetSizeTooLarge { size: u32, max: u32 },
}

/// Errors reported by an inference engine
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Model {model} could not be loaded from {path}: {reason}")]
    ModelLoad {
        model: ModelId,
        path: PathBuf,
        reason: String,
    },

    #[error("Model {model} failed to run: {reason}")]
    Execution { model: ModelId, reason: String },

    #[error("Model {model} returned an invalid score vector: {reason}")]
    InvalidOutput { model: ModelId, reason: String },

    #[error("No model registered for {0}")]
    UnknownModel(ModelId),
}

/// Errors in detector configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Inference backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, DetectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_includes_reason() {
        let error = DecodeError::Malformed {
            reason: "truncated PNG".to_string(),
        };
        assert!(error.to_string().contains("truncated PNG"));
    }

    #[test]
    fn inference_error_names_model() {
        let error = InferenceError::Execution {
            model: ModelId::ResidualGray,
            reason: "session closed".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("residual-gray"));
        assert!(message.contains("session closed"));
    }

    #[test]
    fn stage_errors_convert_into_detect_error() {
        let error: DetectError = DecodeError::Empty.into();
        assert!(matches!(error, DetectError::Decode(DecodeError::Empty)));

        let error: DetectError = PreconditionError::ZeroTargetSize.into();
        assert!(matches!(error, DetectError::Precondition(_)));
    }

    #[test]
    fn precondition_error_reports_lengths() {
        let error = PreconditionError::RasterLength {
            size: 224,
            expected: 150_528,
            actual: 12,
        };
        let message = error.to_string();
        assert!(message.contains("150528"));
        assert!(message.contains("12"));
    }
}
