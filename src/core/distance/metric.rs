//! Shifted similarity distance and the pair-distance seam.

use super::ssim::{structural_similarity, Grid};
use crate::core::features::{FeatureArray, FrameId, SpriteFrame};
use crate::error::ComputeError;

/// Added to the standard deviation during normalization
pub const NORMALIZE_EPSILON: f64 = 1e-8;

/// Source of distances between frames, addressed by frame id.
///
/// Implementations must be pure: the same pair always yields the same value.
pub trait PairDistance: Send + Sync {
    /// Number of frames addressable by this source
    fn len(&self) -> usize;

    /// Distance between frames `i` and `j`, in [0, 1]
    fn distance(&self, i: FrameId, j: FrameId) -> Result<f64, ComputeError>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One minus the best SSIM over a small range of vertical row shifts
#[derive(Debug, Clone, Copy)]
pub struct ShiftedSsim {
    max_shift: usize,
}

impl ShiftedSsim {
    pub fn new(max_shift: usize) -> Self {
        Self { max_shift }
    }

    pub fn max_shift(&self) -> usize {
        self.max_shift
    }

    /// Distance between two feature arrays, clamped into [0, 1].
    ///
    /// Only `b` is rolled, so the result depends on argument order; callers
    /// that need a symmetric value go through [`FrameDistances`].
    pub fn distance(&self, a: &FeatureArray, b: &FeatureArray) -> Result<f64, ComputeError> {
        if a.shape() != b.shape() {
            return Err(ComputeError::ShapeMismatch {
                left: a.shape(),
                right: b.shape(),
            });
        }

        let a = Grid::from_features(a).normalized(NORMALIZE_EPSILON);
        let b = Grid::from_features(b).normalized(NORMALIZE_EPSILON);

        let shift = self.max_shift as isize;
        let mut best = f64::NEG_INFINITY;
        for s in -shift..=shift {
            let score = structural_similarity(&a, &b.rolled_rows(s))?;
            best = best.max(score);
        }

        Ok((1.0 - best).clamp(0.0, 1.0))
    }
}

impl Default for ShiftedSsim {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Distances computed on demand from the frames' feature arrays
pub struct FrameDistances<'a> {
    frames: &'a [SpriteFrame],
    metric: ShiftedSsim,
}

impl<'a> FrameDistances<'a> {
    pub fn new(frames: &'a [SpriteFrame], metric: ShiftedSsim) -> Self {
        Self { frames, metric }
    }

    fn frame(&self, index: FrameId) -> Result<&SpriteFrame, ComputeError> {
        self.frames.get(index).ok_or(ComputeError::FrameOutOfRange {
            index,
            len: self.frames.len(),
        })
    }
}

impl PairDistance for FrameDistances<'_> {
    fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always measured from the lower id to the higher one, so every pair
    /// has exactly one value and it matches the engine's matrix entry
    fn distance(&self, i: FrameId, j: FrameId) -> Result<f64, ComputeError> {
        let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
        let a = self.frame(lo)?;
        let b = self.frame(hi)?;
        let d = self.metric.distance(&a.features, &b.features)?;
        if !d.is_finite() {
            return Err(ComputeError::NonFiniteDistance { i, j });
        }
        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::path::PathBuf;

    /// 16x32 mask with a filled block of rows starting at `top`
    fn block(top: usize, rows: usize) -> FeatureArray {
        let mut data = vec![0.0; 16 * 32];
        for y in top..(top + rows).min(32) {
            for x in 3..13 {
                data[y * 16 + x] = 1.0;
            }
        }
        FeatureArray::from_vec(16, 32, data).unwrap()
    }

    fn blank() -> FeatureArray {
        FeatureArray::from_vec(16, 32, vec![0.0; 16 * 32]).unwrap()
    }

    #[test]
    fn identical_frames_have_zero_distance() {
        let metric = ShiftedSsim::default();
        let d = metric.distance(&block(4, 10), &block(4, 10)).unwrap();
        assert!(d.abs() < 1e-9, "distance was {d}");
    }

    #[test]
    fn small_vertical_offset_is_forgiven() {
        let metric = ShiftedSsim::default();
        let d = metric.distance(&block(4, 10), &block(6, 10)).unwrap();
        assert!(d < 1e-9, "distance was {d}");
    }

    #[test]
    fn offset_beyond_max_shift_is_not_forgiven() {
        let metric = ShiftedSsim::new(0);
        let d = metric.distance(&block(4, 10), &block(6, 10)).unwrap();
        assert!(d > 0.05, "distance was {d}");
    }

    #[test]
    fn distance_is_bounded() {
        let metric = ShiftedSsim::default();
        let shapes = [block(0, 5), block(10, 12), block(20, 3), blank()];
        for a in &shapes {
            for b in &shapes {
                let d = metric.distance(a, b).unwrap();
                assert!((0.0..=1.0).contains(&d), "distance was {d}");
            }
        }
    }

    #[test]
    fn frame_distances_are_symmetric_on_irregular_masks() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let frames: Vec<SpriteFrame> = (0..12)
            .map(|id| {
                let data = (0..16 * 32)
                    .map(|_| if rng.gen_ratio(1, 3) { 1.0 } else { 0.0 })
                    .collect();
                SpriteFrame {
                    id,
                    path: PathBuf::from(format!("cell_{id}.png")),
                    features: FeatureArray::from_vec(16, 32, data).unwrap(),
                }
            })
            .collect();
        let source = FrameDistances::new(&frames, ShiftedSsim::default());

        for i in 0..frames.len() {
            for j in 0..frames.len() {
                let ij = source.distance(i, j).unwrap();
                let ji = source.distance(j, i).unwrap();
                assert_eq!(ij, ji, "d({i}, {j}) != d({j}, {i})");
                assert!((0.0..=1.0).contains(&ij));
            }
        }
    }

    #[test]
    fn blank_frames_compare_without_nan() {
        let metric = ShiftedSsim::default();
        let d = metric.distance(&blank(), &blank()).unwrap();
        assert!(d.is_finite());
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let small = FeatureArray::from_vec(16, 16, vec![0.0; 256]).unwrap();
        let result = ShiftedSsim::default().distance(&block(0, 4), &small);
        assert!(matches!(result, Err(ComputeError::ShapeMismatch { .. })));
    }

    #[test]
    fn frame_distances_reject_unknown_ids() {
        let frames = vec![SpriteFrame {
            id: 0,
            path: PathBuf::from("a.png"),
            features: block(0, 4),
        }];
        let source = FrameDistances::new(&frames, ShiftedSsim::default());
        assert_eq!(source.len(), 1);
        assert!(matches!(
            source.distance(0, 3),
            Err(ComputeError::FrameOutOfRange { index: 3, len: 1 })
        ));
    }
}
