//! # Merge Module
//!
//! Absorbs undersized clusters into the closest large cluster.
//!
//! ## Rules
//! - Clusters with at least `min_large_size` members (3 by default) are
//!   *large* and can receive members; the rest are *small*
//! - Small clusters are visited in ascending label order
//! - The distance from a small cluster to a large one is the mean of every
//!   member-to-member distance
//! - The closest large cluster wins, the first one on ties; the small
//!   cluster is absorbed only when that mean is strictly below the threshold
//! - Means are taken against each large cluster as the builder produced it,
//!   so one absorption never changes the outcome for another small cluster
//!   and raising the threshold can only absorb more frames

use crate::core::cluster::{ClusterLabel, ClusterSet};
use crate::core::distance::PairDistance;
use crate::core::features::FrameId;
use crate::error::ComputeError;
use crate::events::{Event, EventSender, MergeEvent};
use serde::{Deserialize, Serialize};

/// Outcome of evaluating one small cluster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeCandidate {
    /// The small cluster
    pub small: ClusterLabel,
    /// Closest large cluster, if any large cluster exists
    pub best: Option<ClusterLabel>,
    /// Mean distance to `best`
    pub best_distance: Option<f64>,
    /// Whether the small cluster was absorbed into `best`
    pub absorbed: bool,
}

/// Summary of a merge pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeReport {
    /// One entry per small cluster, in visiting order
    pub candidates: Vec<MergeCandidate>,
    /// Number of frames moved into large clusters
    pub absorbed_frames: usize,
}

impl MergeReport {
    /// Number of small clusters that were absorbed
    pub fn absorbed_clusters(&self) -> usize {
        self.candidates.iter().filter(|c| c.absorbed).count()
    }
}

/// Absorbs small clusters into large ones
#[derive(Debug, Clone, Copy)]
pub struct MergeResolver {
    threshold: f64,
    min_large_size: usize,
}

impl MergeResolver {
    pub fn new(threshold: f64, min_large_size: usize) -> Self {
        Self {
            threshold,
            min_large_size,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Run one merge pass over `clusters`.
    ///
    /// Distances come from `distances`, which should compute them from the
    /// frames rather than a cached matrix.
    pub fn resolve(
        &self,
        mut clusters: ClusterSet,
        distances: &dyn PairDistance,
        events: &EventSender,
    ) -> Result<(ClusterSet, MergeReport), ComputeError> {
        let frame_count = clusters.frame_count();

        let large: Vec<(ClusterLabel, Vec<FrameId>)> = clusters
            .iter()
            .filter(|c| c.len() >= self.min_large_size)
            .map(|c| (c.label, c.members().to_vec()))
            .collect();
        let small: Vec<(ClusterLabel, Vec<FrameId>)> = clusters
            .iter()
            .filter(|c| c.len() < self.min_large_size)
            .map(|c| (c.label, c.members().to_vec()))
            .collect();

        tracing::debug!(
            large = large.len(),
            small = small.len(),
            threshold = self.threshold,
            "Resolving small clusters"
        );

        let mut report = MergeReport::default();

        for (small_label, small_members) in &small {
            let mut best: Option<(ClusterLabel, f64)> = None;
            for (large_label, large_members) in &large {
                let mean = mean_distance(small_members, large_members, distances)?;
                if best.map_or(true, |(_, d)| mean < d) {
                    best = Some((*large_label, mean));
                }
            }

            let absorbed = match best {
                Some((into, mean)) if mean < self.threshold => clusters.absorb(*small_label, into),
                _ => false,
            };

            if absorbed {
                report.absorbed_frames += small_members.len();
            }

            match (best, absorbed) {
                (Some((into, mean_distance)), true) => {
                    tracing::debug!(small = small_label, into, mean_distance, "Absorbed small cluster");
                    events.send(Event::Merge(MergeEvent::Absorbed {
                        small: *small_label,
                        into,
                        mean_distance,
                    }));
                }
                _ => {
                    events.send(Event::Merge(MergeEvent::Kept {
                        small: *small_label,
                        best_distance: best.map(|(_, d)| d),
                    }));
                }
            }

            report.candidates.push(MergeCandidate {
                small: *small_label,
                best: best.map(|(label, _)| label),
                best_distance: best.map(|(_, d)| d),
                absorbed,
            });
        }

        clusters.check_partition(frame_count)?;

        events.send(Event::Merge(MergeEvent::Completed {
            absorbed_frames: report.absorbed_frames,
            clusters: clusters.len(),
        }));

        Ok((clusters, report))
    }
}

/// Mean of every pairwise distance between the two member lists
fn mean_distance(
    a: &[FrameId],
    b: &[FrameId],
    distances: &dyn PairDistance,
) -> Result<f64, ComputeError> {
    let mut total = 0.0;
    for &i in a {
        for &j in b {
            total += distances.distance(i, j)?;
        }
    }
    Ok(total / (a.len() * b.len()) as f64)
}
