//! Model-ready float tensors.

use crate::error::PreconditionError;
use serde::{Deserialize, Serialize};

/// How the three channels are laid out in the flat buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TensorLayout {
    /// All of channel 0, then channel 1, then channel 2
    Planar,
    /// One scalar written three times per pixel (`v v v`)
    Interleaved,
}

impl std::fmt::Display for TensorLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TensorLayout::Planar => write!(f, "planar"),
            TensorLayout::Interleaved => write!(f, "interleaved"),
        }
    }
}

/// A flat `f32` buffer with shape `[batch=1, channels, height, width]`
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: Vec<f32>,
    shape: [usize; 4],
    layout: TensorLayout,
}

impl Tensor {
    /// Create a tensor, enforcing `data.len() == channels * height * width`
    pub fn new(
        data: Vec<f32>,
        shape: [usize; 4],
        layout: TensorLayout,
    ) -> Result<Self, PreconditionError> {
        let expected = shape[1]
            .checked_mul(shape[2])
            .and_then(|n| n.checked_mul(shape[3]))
            .unwrap_or(usize::MAX);
        if shape[0] != 1 || data.len() != expected {
            return Err(PreconditionError::TensorLength {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            shape,
            layout,
        })
    }

    /// Shorthand for a single RGB image tensor of `size x size`
    pub fn image(data: Vec<f32>, size: u32, layout: TensorLayout) -> Result<Self, PreconditionError> {
        let size = size as usize;
        Self::new(data, [1, 3, size, size], layout)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn layout(&self) -> TensorLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Summary statistics, used for diagnostics
    pub fn stats(&self) -> TensorStats {
        TensorStats::from_values(&self.data)
    }
}

/// Summary statistics over a tensor's values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TensorStats {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    pub std_dev: f64,
}

impl TensorStats {
    fn from_values(values: &[f32]) -> Self {
        if values.is_empty() {
            return Self {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                std_dev: 0.0,
            };
        }
        let n = values.len() as f64;
        let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
        let variance = values
            .iter()
            .map(|&v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        Self {
            min: values.iter().copied().fold(f32::INFINITY, f32::min),
            max: values.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_length() {
        let err = Tensor::image(vec![0.0; 10], 2, TensorLayout::Planar).unwrap_err();
        assert_eq!(
            err,
            PreconditionError::TensorLength {
                shape: [1, 3, 2, 2],
                expected: 12,
                actual: 10
            }
        );
    }

    #[test]
    fn overflowing_shape_is_rejected() {
        let err = Tensor::new(vec![0.0; 3], [1, 3, usize::MAX, 2], TensorLayout::Planar).unwrap_err();
        assert!(matches!(err, PreconditionError::TensorLength { expected: usize::MAX, .. }));
    }

    #[test]
    fn rejects_batch_other_than_one() {
        assert!(Tensor::new(vec![0.0; 24], [2, 3, 2, 2], TensorLayout::Planar).is_err());
    }

    #[test]
    fn stats_cover_range() {
        let tensor = Tensor::new(vec![-1.0, 1.0, -1.0, 1.0], [1, 1, 2, 2], TensorLayout::Planar)
            .unwrap();
        let stats = tensor.stats();
        assert_eq!(stats.min, -1.0);
        assert_eq!(stats.max, 1.0);
        assert!(stats.mean.abs() < 1e-12);
        assert!((stats.std_dev - 1.0).abs() < 1e-12);
    }
}
