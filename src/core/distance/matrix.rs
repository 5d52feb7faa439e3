//! Symmetric pairwise distance matrix.

use super::metric::PairDistance;
use crate::core::features::FrameId;
use crate::error::ComputeError;

/// Symmetric N x N matrix with a zero diagonal
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// All-zero matrix for `n` frames
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![0.0; n * n],
        }
    }

    /// Fill the upper triangle from `f(i, j)` with `i < j` and mirror it
    #[cfg(test)]
    pub(crate) fn from_fn(n: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut matrix = Self::zeros(n);
        for i in 0..n {
            for j in (i + 1)..n {
                matrix.set(i, j, f(i, j));
            }
        }
        matrix
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn get(&self, i: FrameId, j: FrameId) -> f64 {
        self.data[i * self.n + j]
    }

    /// Distances from frame `i` to every frame
    pub fn row(&self, i: FrameId) -> &[f64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    /// Write both D[i, j] and D[j, i]
    pub(crate) fn set(&mut self, i: FrameId, j: FrameId, value: f64) {
        self.data[i * self.n + j] = value;
        self.data[j * self.n + i] = value;
    }
}

impl PairDistance for DistanceMatrix {
    fn len(&self) -> usize {
        self.n
    }

    fn distance(&self, i: FrameId, j: FrameId) -> Result<f64, ComputeError> {
        for index in [i, j] {
            if index >= self.n {
                return Err(ComputeError::FrameOutOfRange { index, len: self.n });
            }
        }
        Ok(self.get(i, j))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fn_mirrors_upper_triangle() {
        let matrix = DistanceMatrix::from_fn(3, |i, j| (i + j) as f64 / 10.0);
        assert_eq!(matrix.get(0, 2), 0.2);
        assert_eq!(matrix.get(2, 0), 0.2);
        assert_eq!(matrix.get(1, 1), 0.0);
        assert_eq!(matrix.row(1), &[0.1, 0.0, 0.3]);
    }

    #[test]
    fn pair_distance_checks_bounds() {
        let matrix = DistanceMatrix::zeros(2);
        assert!(matrix.distance(0, 1).is_ok());
        assert!(matrix.distance(0, 2).is_err());
    }
}
