//! Gaussian blur kernels and clamp-to-edge convolution.

use crate::error::PreconditionError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A normalized square Gaussian kernel of odd side `k`.
///
/// Entries sum to 1. Pure function of `(k, sigma)`, so it is built once per
/// preprocessor and reused for every image.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    size: usize,
    sigma: f64,
    /// Row-major `size * size` weights
    weights: Vec<f64>,
    /// Normalized 1-D profile; `weights[y][x] == profile[y] * profile[x]`
    profile: Vec<f64>,
}

impl GaussianKernel {
    pub fn new(size: usize, sigma: f64) -> Result<Self, PreconditionError> {
        if size == 0 || size % 2 == 0 {
            return Err(PreconditionError::KernelSize(size));
        }
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(PreconditionError::KernelSigma(sigma));
        }
        Ok(Self::from_valid(size, sigma))
    }

    /// Build without validation; `size` must be odd and `sigma` positive.
    pub(crate) fn from_valid(size: usize, sigma: f64) -> Self {
        let half = (size / 2) as i64;
        let two_sigma_sq = 2.0 * sigma * sigma;

        let mut weights = Vec::with_capacity(size * size);
        for dy in -half..=half {
            for dx in -half..=half {
                let d2 = (dx * dx + dy * dy) as f64;
                weights.push((-d2 / two_sigma_sq).exp());
            }
        }
        let sum: f64 = weights.iter().sum();
        weights.iter_mut().for_each(|w| *w /= sum);

        let mut profile: Vec<f64> = (-half..=half)
            .map(|d| (-((d * d) as f64) / two_sigma_sq).exp())
            .collect();
        let sum: f64 = profile.iter().sum();
        profile.iter_mut().for_each(|w| *w /= sum);

        Self {
            size,
            sigma,
            weights,
            profile,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Weight at offset `(dy, dx)` measured from the top-left corner
    pub fn at(&self, dy: usize, dx: usize) -> f64 {
        self.weights[dy * self.size + dx]
    }

    /// Direct 2-D convolution of a `side x side` plane, clamping at the edges.
    ///
    /// O(side² · k²). Rows are computed in parallel.
    pub fn convolve_direct(&self, plane: &[f32], side: usize) -> Vec<f32> {
        let half = (self.size / 2) as isize;
        let last = side as isize - 1;
        let mut out = vec![0.0f32; side * side];

        out.par_chunks_mut(side).enumerate().for_each(|(y, row)| {
            for (x, slot) in row.iter_mut().enumerate() {
                let mut acc = 0.0f64;
                for ky in -half..=half {
                    let iy = (y as isize + ky).clamp(0, last) as usize;
                    let krow = ((ky + half) as usize) * self.size;
                    for kx in -half..=half {
                        let ix = (x as isize + kx).clamp(0, last) as usize;
                        acc += plane[iy * side + ix] as f64 * self.weights[krow + (kx + half) as usize];
                    }
                }
                *slot = acc as f32;
            }
        });

        out
    }

    /// Separable convolution: horizontal pass then vertical pass.
    ///
    /// O(side² · 2k). Clamping is per axis, so this matches the direct
    /// convolution up to floating-point rounding.
    pub fn convolve_separable(&self, plane: &[f32], side: usize) -> Vec<f32> {
        let half = (self.size / 2) as isize;
        let last = side as isize - 1;

        let mut horizontal = vec![0.0f64; side * side];
        horizontal
            .par_chunks_mut(side)
            .enumerate()
            .for_each(|(y, row)| {
                let src = &plane[y * side..(y + 1) * side];
                for (x, slot) in row.iter_mut().enumerate() {
                    *slot = (-half..=half)
                        .map(|k| {
                            let ix = (x as isize + k).clamp(0, last) as usize;
                            src[ix] as f64 * self.profile[(k + half) as usize]
                        })
                        .sum();
                }
            });

        let mut out = vec![0.0f32; side * side];
        out.par_chunks_mut(side).enumerate().for_each(|(y, row)| {
            for (x, slot) in row.iter_mut().enumerate() {
                let acc: f64 = (-half..=half)
                    .map(|k| {
                        let iy = (y as isize + k).clamp(0, last) as usize;
                        horizontal[iy * side + x] * self.profile[(k + half) as usize]
                    })
                    .sum();
                *slot = acc as f32;
            }
        });

        out
    }
}

/// Which convolution the residual preprocessor runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlurStrategy {
    /// Full 2-D kernel per pixel
    Direct,
    /// Two 1-D passes
    #[default]
    Separable,
}

impl BlurStrategy {
    pub fn apply(&self, kernel: &GaussianKernel, plane: &[f32], side: usize) -> Vec<f32> {
        match self {
            BlurStrategy::Direct => kernel.convolve_direct(plane, side),
            BlurStrategy::Separable => kernel.convolve_separable(plane, side),
        }
    }
}
