//! Integration tests for the detector.
//!
//! These tests verify end-to-end detection behavior including:
//! - Verdicts for each combination of classifier votes
//! - Decode failures never reaching inference
//! - File and batch detection
//! - Model reloads

use ai_image_detector::core::fusion::{FusionConfig, Label};
use ai_image_detector::core::inference::{FnEngine, InferenceEngine, ModelId, ScoreVector};
use ai_image_detector::core::pipeline::{detector_with_engine, Detector};
use ai_image_detector::core::tensor::{Tensor, TensorLayout};
use ai_image_detector::error::{DecodeError, DetectError, InferenceError};
use ai_image_detector::events::{null_sender, BatchEvent, Event, EventChannel};
use assert_fs::prelude::*;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use predicates::prelude::*;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
    bytes
}

/// A small gradient PNG
fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, ((x + y) % 256) as u8])
    });
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

/// A PNG where every pixel is the same color
fn solid_png(size: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(size, size, Rgb(rgb));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

fn fixed_engine(vit: [f32; 2], residual: [f32; 2]) -> Arc<dyn InferenceEngine> {
    Arc::new(FnEngine::new(move |model, _tensor: &Tensor| {
        let scores = match model {
            ModelId::NormalizedRgb => vit,
            ModelId::ResidualGray => residual,
        };
        ScoreVector::new(model, scores.to_vec())
    }))
}

#[test]
fn verdict_follows_or_rule() {
    let cases = [
        ([0.9, 0.1], [5.0, -5.0], false),
        ([0.9, 0.1], [-5.0, 5.0], true),
        ([0.1, 0.9], [5.0, -5.0], true),
        ([0.1, 0.9], [-5.0, 5.0], true),
    ];
    let bytes = gradient_png(40, 30);

    for (vit, residual, expected) in cases {
        let detector = detector_with_engine(fixed_engine(vit, residual)).unwrap();
        let verdict = detector.detect(&bytes).unwrap();

        assert_eq!(verdict.is_ai, expected, "vit {:?} residual {:?}", vit, residual);
        let label = if expected { Label::Fake } else { Label::Real };
        assert_eq!(verdict.label, label);
    }
}

#[test]
fn tied_scores_are_real() {
    let detector = detector_with_engine(fixed_engine([0.0, 0.0], [1.5, 1.5])).unwrap();
    let verdict = detector.detect(&gradient_png(16, 16)).unwrap();

    assert!(!verdict.is_ai);
    assert_eq!(verdict.label_text(), "실제 (Real)");
}

#[test]
fn raw_residual_scores_are_not_softmaxed() {
    // Raw logits are compared as-is, negative values included
    let detector = detector_with_engine(fixed_engine([1.0, 0.0], [-10.0, -9.0])).unwrap();
    let detection = detector.detect_detailed(&gradient_png(16, 16)).unwrap();

    assert!(detection.verdict.is_ai);
    assert_eq!(detection.outcome.residual.fake, -9.0);
    assert_eq!(detection.residual_scores.as_slice(), &[-10.0, -9.0]);
}

#[test]
fn symmetric_fusion_softmaxes_both_models() {
    let detector = Detector::builder()
        .fusion(FusionConfig::symmetric())
        .build(fixed_engine([1.0, 0.0], [0.0, 2.0]))
        .unwrap();
    let detection = detector.detect_detailed(&gradient_png(16, 16)).unwrap();

    let residual = detection.outcome.residual;
    assert!((residual.real + residual.fake - 1.0).abs() < 1e-6);
    assert!(detection.verdict.is_ai);
}

#[test]
fn undecodable_bytes_never_reach_inference() {
    let called = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&called);
    let engine = Arc::new(FnEngine::new(move |model, _tensor: &Tensor| {
        flag.store(true, Ordering::SeqCst);
        ScoreVector::new(model, vec![1.0, 0.0])
    }));
    let detector = detector_with_engine(engine).unwrap();

    let err = detector.detect(b"this is not an image").unwrap_err();

    assert!(matches!(err, DetectError::Decode(_)));
    assert!(!called.load(Ordering::SeqCst));
}

#[test]
fn empty_input_is_a_decode_error() {
    let detector = detector_with_engine(fixed_engine([1.0, 0.0], [1.0, 0.0])).unwrap();

    let err = detector.detect(&[]).unwrap_err();
    assert!(matches!(err, DetectError::Decode(DecodeError::Empty)));
}

#[test]
fn truncated_png_is_a_decode_error() {
    let detector = detector_with_engine(fixed_engine([1.0, 0.0], [1.0, 0.0])).unwrap();
    let bytes = gradient_png(32, 32);

    let err = detector.detect(&bytes[..bytes.len() / 2]).unwrap_err();
    assert!(matches!(err, DetectError::Decode(_)));
}

#[test]
fn invalid_score_vector_aborts_detection() {
    let engine = Arc::new(FnEngine::new(|model, _tensor: &Tensor| match model {
        ModelId::NormalizedRgb => ScoreVector::new(model, vec![1.0, 0.0]),
        ModelId::ResidualGray => ScoreVector::new(model, vec![f32::NAN, 0.0]),
    }));
    let detector = detector_with_engine(engine).unwrap();

    let err = detector.detect(&gradient_png(16, 16)).unwrap_err();
    assert!(matches!(err, DetectError::Inference(InferenceError::InvalidOutput { .. })));
}

#[test]
fn flat_gray_image_yields_zero_residual() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let engine = Arc::new(FnEngine::new(move |model, tensor: &Tensor| {
        sink.lock().unwrap().push((model, tensor.clone()));
        ScoreVector::new(model, vec![1.0, 0.0])
    }));
    let detector = detector_with_engine(engine).unwrap();

    detector.detect(&solid_png(224, [128, 128, 128])).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    for (model, tensor) in seen.iter() {
        assert_eq!(tensor.shape(), [1, 3, 224, 224]);
        match model {
            ModelId::ResidualGray => {
                assert_eq!(tensor.layout(), TensorLayout::Interleaved);
                assert!(tensor.data().iter().all(|v| v.abs() < 1e-3));
            }
            ModelId::NormalizedRgb => {
                assert_eq!(tensor.layout(), TensorLayout::Planar);
                // Red plane: (128/255 - 0.485) / 0.229
                let expected = ((128.0 / 255.0 - 0.485) / 0.229) as f32;
                assert!((tensor.data()[0] - expected).abs() < 1e-5);
            }
        }
    }
}

#[test]
fn jpeg_input_is_accepted() {
    let img = ImageBuffer::from_fn(300, 200, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 60]));
    let bytes = encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg);
    let detector = detector_with_engine(fixed_engine([1.0, 0.0], [1.0, 0.0])).unwrap();

    assert!(!detector.detect(&bytes).unwrap().is_ai);
}

#[test]
fn detect_file_reads_from_disk() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("photo.png");
    file.write_binary(&gradient_png(50, 50)).unwrap();
    let detector = detector_with_engine(fixed_engine([0.2, 0.8], [1.0, 0.0])).unwrap();

    let detection = detector.detect_file(file.path()).unwrap();

    assert!(detection.verdict.is_ai);
    assert_eq!(detection.outcome.fake_votes, 1);
}

#[test]
fn detect_file_reports_missing_path() {
    let temp = assert_fs::TempDir::new().unwrap();
    let missing = temp.child("missing.png");
    let detector = detector_with_engine(fixed_engine([1.0, 0.0], [1.0, 0.0])).unwrap();

    let err = detector.detect_file(missing.path()).unwrap_err();

    assert!(predicate::str::contains("missing.png").eval(&err.to_string()));
}

#[test]
fn batch_reports_each_file_and_summary() {
    let temp = assert_fs::TempDir::new().unwrap();
    let good = temp.child("good.png");
    good.write_binary(&gradient_png(20, 20)).unwrap();
    let bad = temp.child("bad.png");
    bad.write_str("corrupt").unwrap();

    let detector = detector_with_engine(fixed_engine([0.0, 1.0], [1.0, 0.0])).unwrap();
    let (sender, receiver) = EventChannel::new();
    let paths = vec![good.path().to_path_buf(), bad.path().to_path_buf()];

    let result = detector.detect_batch(&paths, &sender);

    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[0].0, paths[0]);
    assert!(result.items[0].1.is_ok());
    assert!(result.items[1].1.is_err());
    assert_eq!(result.flagged(), 1);
    assert_eq!(result.failed(), 1);
    assert!(!result.all_failed());

    let summary = receiver.drain().into_iter().find_map(|e| match e {
        Event::Batch(BatchEvent::Completed(summary)) => Some(summary),
        _ => None,
    });
    let summary = summary.expect("batch summary event");
    assert_eq!(summary.total_images, 2);
    assert_eq!(summary.flagged, 1);
    assert_eq!(summary.failed, 1);
}

#[test]
fn batch_with_only_bad_files_is_all_failed() {
    let temp = assert_fs::TempDir::new().unwrap();
    let bad = temp.child("bad.jpg");
    bad.write_str("corrupt").unwrap();
    let missing = temp.child("missing.png");

    let detector = detector_with_engine(fixed_engine([1.0, 0.0], [1.0, 0.0])).unwrap();
    let paths = vec![bad.path().to_path_buf(), missing.path().to_path_buf()];

    let result = detector.detect_batch(&paths, &null_sender());

    assert_eq!(result.failed(), 2);
    assert!(result.all_failed());
}

struct ReloadCounter {
    reloads: AtomicUsize,
}

impl InferenceEngine for ReloadCounter {
    fn infer(&self, model: ModelId, _tensor: &Tensor) -> Result<ScoreVector, InferenceError> {
        ScoreVector::new(model, vec![1.0, 0.0])
    }

    fn reload(&self) -> Result<(), InferenceError> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn reload_models_delegates_to_engine() {
    let engine = Arc::new(ReloadCounter {
        reloads: AtomicUsize::new(0),
    });
    let detector = detector_with_engine(engine.clone()).unwrap();

    detector.reload_models().unwrap();
    detector.reload_models().unwrap();

    assert_eq!(engine.reloads.load(Ordering::SeqCst), 2);
}

#[test]
fn detection_serializes_to_json() {
    let detector = detector_with_engine(fixed_engine([0.0, 1.0], [1.0, 0.0])).unwrap();
    let detection = detector.detect_detailed(&gradient_png(10, 10)).unwrap();

    let json = serde_json::to_value(&detection).unwrap();
    assert_eq!(json["verdict"]["is_ai"], true);
    assert_eq!(json["outcome"]["fake_votes"], 1);
}
