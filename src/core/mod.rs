//! # Core Module
//!
//! The UI-agnostic grouping engine.
//!
//! ## Modules
//! - `slicer` - Cuts sprite sheets into non-empty cells
//! - `features` - Turns a cell into a luminance feature array
//! - `distance` - Shift-tolerant SSIM distance and the parallel engine
//! - `cluster` - Average-linkage clustering below a threshold
//! - `merge` - Folds small clusters into close large ones
//! - `naming` - Loads the name list and hands out group names
//! - `export` - Writes the mod folder, manifest and archive
//! - `pipeline` - Orchestrates the full workflow

pub mod cluster;
pub mod distance;
pub mod export;
pub mod features;
pub mod merge;
pub mod naming;
pub mod pipeline;
pub mod slicer;

// Re-export commonly used types
pub use cluster::{Cluster, ClusterLabel, ClusterSet};
pub use distance::{DistanceMatrix, PairDistance};
pub use features::{FeatureArray, FrameId, SpriteFrame};
pub use merge::MergeReport;
pub use pipeline::{Pipeline, PipelineBuilder, PipelineResult};
