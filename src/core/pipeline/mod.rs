//! # Pipeline Module
//!
//! Orchestrates the full grouping workflow.
//!
//! ## Pipeline Stages
//! 1. **Slice** - Cut sprite sheets into non-empty cells
//! 2. **Extract** - Turn each cell into a feature array
//! 3. **Measure** - Compute every pairwise distance in parallel
//! 4. **Cluster** - Average-linkage clustering below the aggregation threshold
//! 5. **Merge** - Absorb small clusters into close large ones
//! 6. **Export** - Name the clusters and write the mod folder and archive
//!
//! Stages 3 to 5 are skipped when grouping is disabled; every frame then
//! becomes its own group.
//!
//! ## Parallelism
//! Uses rayon for feature extraction and the distance engine.

mod executor;

pub use executor::{Pipeline, PipelineBuilder, PipelineResult};
