//! # AI Image Detector
//!
//! Decides whether an image was produced by a generative model.
//!
//! ## How It Works
//! - The image is decoded and stretched to a 224×224 RGB raster
//! - One classifier sees ImageNet-normalized color
//! - A second classifier sees the high-frequency residual of the grayscale image
//! - The image is flagged when either classifier votes fake
//!
//! ## Architecture
//! - `core` - The detection engine
//! - `events` - Event-driven progress reporting
//! - `error` - Error types for every stage
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use crate::core::{Detection, Detector, DetectorConfig, Label, Verdict};
pub use error::{DetectError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. Calling it twice
/// keeps the first subscriber.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
