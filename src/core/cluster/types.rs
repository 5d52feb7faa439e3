//! Cluster and cluster-set types.

use crate::core::features::FrameId;
use crate::error::ComputeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label identifying a cluster within one run
pub type ClusterLabel = usize;

/// A labelled, non-empty group of frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub label: ClusterLabel,
    members: Vec<FrameId>,
}

impl Cluster {
    /// Returns `None` for an empty member list
    pub fn new(label: ClusterLabel, members: Vec<FrameId>) -> Option<Self> {
        if members.is_empty() {
            return None;
        }
        Some(Self { label, members })
    }

    pub fn members(&self) -> &[FrameId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Mapping from label to cluster, kept as a partition of the frame set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSet {
    clusters: BTreeMap<ClusterLabel, Cluster>,
}

impl ClusterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// One cluster per frame, labelled by frame id
    pub fn singletons(frame_count: usize) -> Self {
        Self::from_groups((0..frame_count).map(|id| vec![id]))
    }

    /// Label groups 0, 1, 2, ... in the order given, skipping empty ones
    pub fn from_groups(groups: impl IntoIterator<Item = Vec<FrameId>>) -> Self {
        let clusters = groups
            .into_iter()
            .filter(|members| !members.is_empty())
            .enumerate()
            .filter_map(|(label, members)| Cluster::new(label, members).map(|c| (label, c)))
            .collect();
        Self { clusters }
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn get(&self, label: ClusterLabel) -> Option<&Cluster> {
        self.clusters.get(&label)
    }

    /// Clusters in ascending label order
    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    /// Labels in ascending order
    pub fn labels(&self) -> Vec<ClusterLabel> {
        self.clusters.keys().copied().collect()
    }

    /// Total number of member frames
    pub fn frame_count(&self) -> usize {
        self.clusters.values().map(Cluster::len).sum()
    }

    /// Append the members of `from` to `into` and retire `from`'s label.
    ///
    /// Returns false and leaves the set untouched when either label is
    /// missing or both are the same.
    pub fn absorb(&mut self, from: ClusterLabel, into: ClusterLabel) -> bool {
        if from == into || !self.clusters.contains_key(&into) {
            return false;
        }
        let Some(source) = self.clusters.remove(&from) else {
            return false;
        };
        if let Some(target) = self.clusters.get_mut(&into) {
            target.members.extend(source.members);
        }
        true
    }

    /// Verify that the clusters partition frames `0..frame_count`
    pub fn check_partition(&self, frame_count: usize) -> Result<(), ComputeError> {
        let mut seen = vec![false; frame_count];
        for cluster in self.clusters.values() {
            if cluster.members.is_empty() {
                return Err(ComputeError::PartitionViolated(format!(
                    "cluster {} is empty",
                    cluster.label
                )));
            }
            for &id in &cluster.members {
                match seen.get_mut(id) {
                    None => {
                        return Err(ComputeError::PartitionViolated(format!(
                            "frame {id} in cluster {} does not exist",
                            cluster.label
                        )))
                    }
                    Some(true) => {
                        return Err(ComputeError::PartitionViolated(format!(
                            "frame {id} appears in more than one cluster"
                        )))
                    }
                    Some(slot) => *slot = true,
                }
            }
        }
        if let Some(missing) = seen.iter().position(|&s| !s) {
            return Err(ComputeError::PartitionViolated(format!(
                "frame {missing} is not in any cluster"
            )));
        }
        Ok(())
    }
}
