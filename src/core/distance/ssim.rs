//! Structural similarity over 2D float grids.
//!
//! Uses a 7x7 uniform window with sample covariance and a data range of
//! 1.0. The score is the mean over every window that fits entirely inside
//! the grid.

use crate::core::features::FeatureArray;
use crate::error::ComputeError;

/// Side of the square SSIM window
pub const WINDOW: usize = 7;

const K1: f64 = 0.01;
const K2: f64 = 0.03;
const DATA_RANGE: f64 = 1.0;

/// Row-major 2D grid of floats
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
}

impl Grid {
    pub fn from_features(features: &FeatureArray) -> Self {
        Self {
            width: features.width(),
            height: features.height(),
            data: features.values().to_vec(),
        }
    }

    /// Shift to zero mean and unit variance.
    ///
    /// `epsilon` is added to the standard deviation so a blank grid stays finite.
    pub fn normalized(&self, epsilon: f64) -> Self {
        let len = self.data.len().max(1) as f64;
        let mean = self.data.iter().sum::<f64>() / len;
        let variance = self.data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / len;
        let scale = variance.sqrt() + epsilon;

        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|v| (v - mean) / scale).collect(),
        }
    }

    /// Rotate rows downwards by `shift` (negative moves them up), wrapping around
    pub fn rolled_rows(&self, shift: isize) -> Self {
        let height = self.height as isize;
        let mut data = Vec::with_capacity(self.data.len());
        for row in 0..height {
            let source = (row - shift).rem_euclid(height.max(1)) as usize;
            let start = source * self.width;
            data.extend_from_slice(&self.data[start..start + self.width]);
        }
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

/// Summed-area table with one padding row and column
struct Integral {
    stride: usize,
    sums: Vec<f64>,
}

impl Integral {
    fn build(width: usize, height: usize, value: impl Fn(usize) -> f64) -> Self {
        let stride = width + 1;
        let mut sums = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row_sum = 0.0;
            for x in 0..width {
                row_sum += value(y * width + x);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row_sum;
            }
        }
        Self { stride, sums }
    }

    /// Sum over the WINDOW x WINDOW block whose top-left corner is (x, y)
    fn window(&self, x: usize, y: usize) -> f64 {
        let s = self.stride;
        let (x1, y1) = (x + WINDOW, y + WINDOW);
        self.sums[y1 * s + x1] - self.sums[y * s + x1] - self.sums[y1 * s + x] + self.sums[y * s + x]
    }
}

/// Mean structural similarity of two equally sized grids
pub fn structural_similarity(a: &Grid, b: &Grid) -> Result<f64, ComputeError> {
    if (a.width, a.height) != (b.width, b.height) {
        return Err(ComputeError::ShapeMismatch {
            left: (a.width, a.height),
            right: (b.width, b.height),
        });
    }
    if a.width < WINDOW || a.height < WINDOW {
        return Err(ComputeError::ArrayTooSmall {
            width: a.width,
            height: a.height,
            window: WINDOW,
        });
    }

    let (w, h) = (a.width, a.height);
    let sx = Integral::build(w, h, |i| a.data[i]);
    let sy = Integral::build(w, h, |i| b.data[i]);
    let sxx = Integral::build(w, h, |i| a.data[i] * a.data[i]);
    let syy = Integral::build(w, h, |i| b.data[i] * b.data[i]);
    let sxy = Integral::build(w, h, |i| a.data[i] * b.data[i]);

    let np = (WINDOW * WINDOW) as f64;
    let cov_norm = np / (np - 1.0);
    let c1 = (K1 * DATA_RANGE).powi(2);
    let c2 = (K2 * DATA_RANGE).powi(2);

    let mut total = 0.0;
    let mut count = 0usize;
    for y in 0..=(h - WINDOW) {
        for x in 0..=(w - WINDOW) {
            let ux = sx.window(x, y) / np;
            let uy = sy.window(x, y) / np;
            let uxx = sxx.window(x, y) / np;
            let uyy = syy.window(x, y) / np;
            let uxy = sxy.window(x, y) / np;

            let vx = cov_norm * (uxx - ux * ux);
            let vy = cov_norm * (uyy - uy * uy);
            let vxy = cov_norm * (uxy - ux * uy);

            let numerator = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
            let denominator = (ux * ux + uy * uy + c1) * (vx + vy + c2);
            total += numerator / denominator;
            count += 1;
        }
    }

    Ok(total / count as f64)
}
