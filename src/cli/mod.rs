//! # CLI Module
//!
//! Command-line interface for the AI image detector.
//!
//! ## Usage
//! ```bash
//! # Check one image
//! ai-detect detect photo.jpg --vit-model binary_ViT.onnx --residual-model binary_ReFor.onnx
//!
//! # Check many images, JSON output
//! ai-detect detect ~/Downloads/*.png --output json
//!
//! # Read the residual scores through softmax as well
//! ai-detect detect photo.jpg --normalize-residual
//!
//! # Show what the classifiers would be fed
//! ai-detect inspect photo.jpg
//!
//! # Check that both models load
//! ai-detect status --vit-model binary_ViT.onnx --residual-model binary_ReFor.onnx
//! ```

use ai_image_detector::core::decoder::{read_file_bytes, FastRasterDecoder, ImageFormat, RasterDecoder};
use ai_image_detector::core::fusion::{ModelVote, ScoreInterpretation};
use ai_image_detector::core::inference::{InferenceEngine, ModelId, ModelPaths, ModelStatus};
use ai_image_detector::core::pipeline::{BatchResult, Detection, Detector, DetectorConfig};
use ai_image_detector::core::preprocess::DualPreprocessor;
use ai_image_detector::core::tensor::Tensor;
use ai_image_detector::error::{DetectError, Result};
use ai_image_detector::events::{BatchEvent, Event, EventChannel};
use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

/// AI Image Detector - Was this picture generated?
#[derive(Parser, Debug)]
#[command(name = "ai-detect")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify images as real or AI-generated
    Detect {
        /// Image files to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// ONNX model fed ImageNet-normalized RGB
        #[arg(long)]
        vit_model: Option<PathBuf>,

        /// ONNX model fed the grayscale residual
        #[arg(long)]
        residual_model: Option<PathBuf>,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Read the residual model's scores through softmax
        #[arg(long)]
        normalize_residual: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Load both models and report which are ready
    Status {
        /// ONNX model fed ImageNet-normalized RGB
        #[arg(long)]
        vit_model: Option<PathBuf>,

        /// ONNX model fed the grayscale residual
        #[arg(long)]
        residual_model: Option<PathBuf>,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Show the tensors built for an image, without running models
    Inspect {
        /// Image file to inspect
        path: PathBuf,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (flagged paths only)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Detect {
            paths,
            vit_model,
            residual_model,
            config,
            normalize_residual,
            output,
            verbose,
        } => {
            if verbose {
                ai_image_detector::init_tracing();
            }
            let config = apply_overrides(
                load_config(config.as_deref())?,
                vit_model,
                residual_model,
                normalize_residual,
            );
            run_detect(paths, config, output, verbose)
        }
        Commands::Status {
            vit_model,
            residual_model,
            config,
            output,
        } => {
            let config =
                apply_overrides(load_config(config.as_deref())?, vit_model, residual_model, false);
            run_status(config, output)
        }
        Commands::Inspect {
            path,
            config,
            output,
        } => run_inspect(&path, load_config(config.as_deref())?, output),
    }
}

fn load_config(path: Option<&Path>) -> Result<DetectorConfig> {
    Ok(match path {
        Some(path) => DetectorConfig::from_json_file(path)?,
        None => DetectorConfig::default(),
    })
}

/// Layer command-line flags over the loaded config
fn apply_overrides(
    mut config: DetectorConfig,
    vit_model: Option<PathBuf>,
    residual_model: Option<PathBuf>,
    normalize_residual: bool,
) -> DetectorConfig {
    if let Some(path) = vit_model {
        config.models.normalized_rgb = path;
    }
    if let Some(path) = residual_model {
        config.models.residual_gray = path;
    }
    if normalize_residual {
        config.fusion.residual_scores = ScoreInterpretation::Softmax;
    }
    config
}

/// Create the ONNX engine and load both models.
///
/// With `require_all`, a model that fails to load is an error; otherwise the
/// failure is left for the engine's status to report.
#[cfg(feature = "onnx")]
fn build_engine(models: &ModelPaths, require_all: bool) -> Result<Arc<dyn InferenceEngine>> {
    use ai_image_detector::core::inference::OnnxEngine;

    let engine = OnnxEngine::new(models.clone());
    let warm_up = engine.warm_up();
    if require_all {
        warm_up?;
    }
    Ok(Arc::new(engine))
}

#[cfg(not(feature = "onnx"))]
fn build_engine(_models: &ModelPaths, _require_all: bool) -> Result<Arc<dyn InferenceEngine>> {
    use ai_image_detector::error::ConfigError;

    Err(ConfigError::BackendUnavailable(
        "this binary was built without the `onnx` feature".to_string(),
    )
    .into())
}

fn run_detect(
    paths: Vec<PathBuf>,
    config: DetectorConfig,
    output: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let term = Term::stderr();

    // Print header
    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("AI Image Detector").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let engine = build_engine(&config.models, true)?;
    let detector = Detector::builder().config(config).build(engine)?;

    // Set up event handling
    let (sender, receiver) = EventChannel::new();

    // Progress bar for pretty output
    let progress = if matches!(output, OutputFormat::Pretty) && paths.len() > 1 {
        let pb = ProgressBar::new(paths.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Batch(BatchEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                    pb.set_message(format!("{} flagged", p.flagged));
                    if verbose {
                        pb.println(format!("  checked {}", p.current));
                    }
                }
                Event::Batch(BatchEvent::Completed(_)) => pb.finish_and_clear(),
                _ => {}
            }
        }
    });

    let result = detector.detect_batch(&paths, &sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();

    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &result, verbose),
        OutputFormat::Json => print_json_results(&result),
        OutputFormat::Minimal => print_minimal_results(&result),
    }

    if result.all_failed() {
        return Err(DetectError::BatchFailed {
            total: result.items.len(),
        });
    }
    Ok(())
}

fn run_status(config: DetectorConfig, output: OutputFormat) -> Result<()> {
    let models = config.models.clone();
    let engine = build_engine(&models, false)?;
    let detector = Detector::builder().config(config).build(engine)?;
    let status = detector.model_status();

    match output {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "is_initialized": status.is_initialized(),
                "total_models": status.total,
                "loaded_models": status.loaded,
                "load_success": status.loaded.len(),
                "load_failed": status.failed.len(),
                "failed_models": status.failed.iter().map(|(model, reason)| {
                    serde_json::json!({ "model": model, "error": reason })
                }).collect::<Vec<_>>(),
            });
            match serde_json::to_string_pretty(&output) {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("failed to serialize status: {}", e),
            }
        }
        OutputFormat::Pretty | OutputFormat::Minimal => {
            print_status(&Term::stdout(), &status, &models)
        }
    }

    Ok(())
}

fn print_status(term: &Term, status: &ModelStatus, models: &ModelPaths) {
    for model in ModelId::ALL {
        let line = if status.loaded.contains(&model) {
            format!("{} {:<14} loaded", style("✓").green().bold(), model.to_string())
        } else {
            let reason = status
                .failed
                .iter()
                .find(|(failed, _)| *failed == model)
                .map(|(_, reason)| reason.as_str())
                .unwrap_or("not loaded");
            format!(
                "{} {:<14} {}",
                style("✗").red().bold(),
                model.to_string(),
                style(reason).red()
            )
        };
        term.write_line(&line).ok();
        term.write_line(&format!(
            "    {}",
            style(display_path(models.path_for(model))).dim()
        ))
        .ok();
    }

    term.write_line(&format!(
        "  {}/{} models ready",
        style(status.loaded.len()).cyan(),
        status.total
    ))
    .ok();
}

fn print_pretty_results(term: &Term, result: &BatchResult, verbose: bool) {
    for (path, outcome) in &result.items {
        match outcome {
            Ok(detection) => print_pretty_detection(term, path, detection, verbose),
            Err(e) => {
                term.write_line(&format!(
                    "{} {}  {}",
                    style("!").yellow().bold(),
                    display_path(path),
                    style(e).red()
                ))
                .ok();
            }
        }
    }

    term.write_line("").ok();
    term.write_line(&format!(
        "  {} images checked in {:.1}s, {} flagged, {} failed",
        style(result.items.len()).cyan(),
        result.duration_ms as f64 / 1000.0,
        style(result.flagged()).yellow(),
        style(result.failed()).dim()
    ))
    .ok();
}

fn print_pretty_detection(term: &Term, path: &Path, detection: &Detection, verbose: bool) {
    let verdict = detection.verdict;
    let marker = if verdict.is_ai {
        style("✗").red().bold().to_string()
    } else {
        style("✓").green().bold().to_string()
    };
    let label = if verdict.is_ai {
        style(verdict.label_text()).red().to_string()
    } else {
        style(verdict.label_text()).green().to_string()
    };

    term.write_line(&format!("{} {}  {}", marker, display_path(path), label))
        .ok();

    if verbose {
        for vote in [&detection.outcome.normalized, &detection.outcome.residual] {
            term.write_line(&format_vote(vote)).ok();
        }
        term.write_line(&format!(
            "    {} {:.3}",
            style("confidence").dim(),
            detection.outcome.confidence
        ))
        .ok();
    }
}

fn format_vote(vote: &ModelVote) -> String {
    format!(
        "    {:<14} real {:>8.3}  fake {:>8.3}  {}",
        vote.model.to_string(),
        vote.real,
        vote.fake,
        if vote.is_fake {
            style("fake").red().to_string()
        } else {
            style("real").dim().to_string()
        }
    )
}

fn print_json_results(result: &BatchResult) {
    let output = serde_json::json!({
        "total_images": result.items.len(),
        "flagged": result.flagged(),
        "failed": result.failed(),
        "duration_ms": result.duration_ms,
        "results": result.items.iter().map(|(path, outcome)| match outcome {
            Ok(detection) => serde_json::json!({
                "path": path,
                "is_ai": detection.verdict.is_ai,
                "label": detection.verdict.label_text(),
                "detection": detection,
            }),
            Err(e) => serde_json::json!({
                "path": path,
                "error": e.to_string(),
            }),
        }).collect::<Vec<_>>()
    });

    match serde_json::to_string_pretty(&output) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("failed to serialize results: {}", e),
    }
}

fn print_minimal_results(result: &BatchResult) {
    for (path, outcome) in &result.items {
        if matches!(outcome, Ok(d) if d.verdict.is_ai) {
            println!("{}", path.display());
        }
    }
}

fn run_inspect(path: &Path, config: DetectorConfig, output: OutputFormat) -> Result<()> {
    let bytes = read_file_bytes(path)?;
    let format = ImageFormat::from_bytes(&bytes);

    let raster = FastRasterDecoder::new(config.target_size).decode(&bytes)?;
    let tensors = DualPreprocessor::new(&config.preprocess)?.run(&raster)?;

    match output {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "path": path,
                "bytes": bytes.len(),
                "format": format!("{:?}", format),
                "raster_size": raster.size(),
                "tensors": {
                    "normalized": tensor_json(&tensors.normalized),
                    "residual": tensor_json(&tensors.residual),
                },
            });
            match serde_json::to_string_pretty(&output) {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("failed to serialize results: {}", e),
            }
        }
        OutputFormat::Pretty | OutputFormat::Minimal => {
            let term = Term::stdout();
            term.write_line(&format!(
                "{} {} ({:?}, {})",
                style("Image").bold(),
                display_path(path),
                format,
                format_bytes(bytes.len() as u64)
            ))
            .ok();
            for (name, tensor) in [
                ("normalized", &tensors.normalized),
                ("residual", &tensors.residual),
            ] {
                let stats = tensor.stats();
                term.write_line(&format!(
                    "  {:<10} {:?} {:?}  min {:.4}  max {:.4}  mean {:.4}  std {:.4}",
                    style(name).cyan(),
                    tensor.shape(),
                    tensor.layout(),
                    stats.min,
                    stats.max,
                    stats.mean,
                    stats.std_dev
                ))
                .ok();
            }
        }
    }

    Ok(())
}

fn tensor_json(tensor: &Tensor) -> serde_json::Value {
    serde_json::json!({
        "shape": tensor.shape(),
        "layout": tensor.layout(),
        "stats": tensor.stats(),
    })
}

fn display_path(path: &Path) -> String {
    let home = dirs::home_dir().unwrap_or_default();
    match path.strip_prefix(&home) {
        Ok(rest) if !home.as_os_str().is_empty() => format!("~/{}", rest.display()),
        _ => path.display().to_string(),
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_image_detector::core::fusion::FusionConfig;

    #[test]
    fn normalize_residual_keeps_configured_normalized_scores() {
        let mut config = DetectorConfig::default();
        config.fusion.normalized_scores = ScoreInterpretation::Raw;

        let config = apply_overrides(config, None, None, true);

        assert_eq!(config.fusion.normalized_scores, ScoreInterpretation::Raw);
        assert_eq!(config.fusion.residual_scores, ScoreInterpretation::Softmax);
    }

    #[test]
    fn overrides_leave_config_alone_when_unset() {
        let config = apply_overrides(DetectorConfig::default(), None, None, false);

        assert_eq!(config, DetectorConfig::default());
        assert_eq!(config.fusion, FusionConfig::default());
    }

    #[test]
    fn model_paths_override_config() {
        let config = apply_overrides(
            DetectorConfig::default(),
            Some(PathBuf::from("vit.onnx")),
            Some(PathBuf::from("residual.onnx")),
            false,
        );

        assert_eq!(config.models.normalized_rgb, PathBuf::from("vit.onnx"));
        assert_eq!(config.models.residual_gray, PathBuf::from("residual.onnx"));
    }

    #[test]
    fn cli_parses_status_command() {
        let cli = Cli::try_parse_from(["ai-detect", "status", "--output", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Status {
                output: OutputFormat::Json,
                ..
            }
        ));
    }
}
