//! Detector configuration.

use crate::core::fusion::FusionConfig;
use crate::core::inference::ModelPaths;
use crate::core::preprocess::PreprocessConfig;
use crate::core::raster::{DEFAULT_TARGET_SIZE, MAX_TARGET_SIZE};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything that shapes a detection, loadable from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Edge length images are stretched to
    pub target_size: u32,
    /// Residual blur settings
    pub preprocess: PreprocessConfig,
    /// How the two score vectors are combined
    pub fusion: FusionConfig,
    /// Model files used by the ONNX backend
    pub models: ModelPaths,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_TARGET_SIZE,
            preprocess: PreprocessConfig::default(),
            fusion: FusionConfig::default(),
            models: ModelPaths::default(),
        }
    }
}

impl DetectorConfig {
    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no detector can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "target_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.target_size > MAX_TARGET_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "target_size",
                reason: format!("must be at most {}, got {}", MAX_TARGET_SIZE, self.target_size),
            });
        }
        if self.preprocess.kernel_size % 2 == 0 {
            return Err(ConfigError::InvalidValue {
                field: "preprocess.kernel_size",
                reason: format!("must be odd, got {}", self.preprocess.kernel_size),
            });
        }
        if !(self.preprocess.sigma.is_finite() && self.preprocess.sigma > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "preprocess.sigma",
                reason: format!("must be positive, got {}", self.preprocess.sigma),
            });
        }
        Ok(())
    }
}
