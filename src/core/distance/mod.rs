//! # Distance Module
//!
//! Pairwise dissimilarity between sprite frames.
//!
//! ## Shifted Similarity Distance
//! 1. Normalize both feature arrays to zero mean and unit variance
//! 2. Roll the second array vertically by every shift in `-max_shift..=max_shift`
//! 3. Score each shift with structural similarity (SSIM)
//! 4. Distance = 1 - best score
//!
//! Sheets are cut into fixed-size cells, so the same hairstyle can sit a
//! row or two higher in one cell than in another. Trying small shifts keeps
//! those frames close.
//!
//! ## Parallelism
//! [`DistanceEngine`] spreads all `i < j` pairs over a rayon pool sized to
//! the host and assembles the matrix on the calling thread.

mod engine;
mod matrix;
mod metric;
pub mod ssim;

pub use engine::DistanceEngine;
pub use matrix::DistanceMatrix;
pub use metric::{FrameDistances, PairDistance, ShiftedSsim, NORMALIZE_EPSILON};
