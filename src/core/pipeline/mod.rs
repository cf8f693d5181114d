//! # Pipeline Module
//!
//! Runs one image through the whole detector.
//!
//! ## Pipeline Stages
//! 1. **Decode** - Sniff the format, decode, stretch to a square RGB raster
//! 2. **Preprocess** - Build the normalized and residual tensors (in parallel)
//! 3. **Infer** - Score each tensor with its classifier (in parallel)
//! 4. **Fuse** - Combine both votes into one verdict
//!
//! A failure in any stage aborts the request. Nothing later runs.
//!
//! ## Parallelism
//! Uses rayon inside a request and across files in a batch.

mod config;
mod executor;

pub use config::DetectorConfig;
pub use executor::{detector_with_engine, BatchResult, Detection, Detector, DetectorBuilder};
