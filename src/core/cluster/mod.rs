//! # Cluster Module
//!
//! Partitions frames into clusters from the distance matrix.
//!
//! ## How It Works
//! 1. Start with every frame in its own cluster
//! 2. Repeatedly join the two clusters with the smallest average distance
//! 3. Stop once that distance reaches the aggregation threshold
//!
//! When grouping is disabled the builder is skipped and
//! [`ClusterSet::singletons`] is used instead.

mod builder;
mod types;

pub use builder::{linkage, ClusterBuilder, Merge};
pub use types::{Cluster, ClusterLabel, ClusterSet};
