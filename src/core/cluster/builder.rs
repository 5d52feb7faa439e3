//! Average-linkage agglomerative clustering over a precomputed matrix.
//!
//! The full merge tree is built with the nearest-neighbour chain algorithm
//! and then cut at the threshold: every merge whose linkage distance is
//! strictly below the threshold is applied. Average linkage never produces
//! a merge lower than the merges beneath it, so this is the same partition
//! as greedily merging the closest pair until the closest pair reaches the
//! threshold.
//!
//! Ties: a nearest-neighbour search prefers the previous chain element,
//! then the lowest cluster index. A merged cluster keeps the lower index.

use super::types::ClusterSet;
use crate::core::distance::DistanceMatrix;
use crate::core::features::FrameId;
use std::collections::BTreeMap;

/// One step of the merge tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    /// Index of the surviving cluster (lowest member frame id)
    pub left: FrameId,
    /// Index of the retired cluster
    pub right: FrameId,
    /// Average linkage distance at which the two clusters joined
    pub distance: f64,
    /// Size of the merged cluster
    pub size: usize,
}

/// Builds the initial cluster set from a distance matrix
#[derive(Debug, Clone, Copy)]
pub struct ClusterBuilder {
    threshold: f64,
}

impl ClusterBuilder {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Partition the frames of `matrix`.
    ///
    /// Clusters are labelled in order of their lowest member; members are
    /// listed in ascending frame order.
    pub fn build(&self, matrix: &DistanceMatrix) -> ClusterSet {
        let n = matrix.len();
        let mut parent: Vec<usize> = (0..n).collect();

        for merge in linkage(matrix) {
            if merge.distance < self.threshold {
                union(&mut parent, merge.left, merge.right);
            }
        }

        let mut groups: BTreeMap<usize, Vec<FrameId>> = BTreeMap::new();
        for frame in 0..n {
            let root = find(&mut parent, frame);
            groups.entry(root).or_default().push(frame);
        }

        let mut groups: Vec<Vec<FrameId>> = groups.into_values().collect();
        groups.sort_by_key(|members| members[0]);

        let clusters = ClusterSet::from_groups(groups);
        tracing::debug!(
            frames = n,
            clusters = clusters.len(),
            threshold = self.threshold,
            "Built initial clusters"
        );
        clusters
    }
}

/// Full average-linkage merge tree (n - 1 merges for n frames)
pub fn linkage(matrix: &DistanceMatrix) -> Vec<Merge> {
    let n = matrix.len();
    if n < 2 {
        return Vec::new();
    }

    let mut d: Vec<f64> = (0..n).flat_map(|i| matrix.row(i).to_vec()).collect();
    let mut size = vec![1usize; n];
    let mut active = vec![true; n];
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    let mut merges = Vec::with_capacity(n - 1);
    let mut remaining = n;

    while remaining > 1 {
        if chain.is_empty() {
            if let Some(first) = active.iter().position(|&a| a) {
                chain.push(first);
            }
        }

        loop {
            let a = chain[chain.len() - 1];
            let prev = chain.len().checked_sub(2).map(|i| chain[i]);

            let (mut best, mut best_d) = match prev {
                Some(p) => (p, d[a * n + p]),
                None => (usize::MAX, f64::INFINITY),
            };
            for c in 0..n {
                if c == a || !active[c] {
                    continue;
                }
                let dc = d[a * n + c];
                if best == usize::MAX || dc < best_d {
                    best = c;
                    best_d = dc;
                }
            }

            if Some(best) == prev {
                chain.truncate(chain.len() - 2);

                let (keep, gone) = (a.min(best), a.max(best));
                let (size_keep, size_gone) = (size[keep] as f64, size[gone] as f64);
                for k in 0..n {
                    if !active[k] || k == keep || k == gone {
                        continue;
                    }
                    let merged = (size_keep * d[keep * n + k] + size_gone * d[gone * n + k])
                        / (size_keep + size_gone);
                    d[keep * n + k] = merged;
                    d[k * n + keep] = merged;
                }
                active[gone] = false;
                size[keep] += size[gone];
                remaining -= 1;

                merges.push(Merge {
                    left: keep,
                    right: gone,
                    distance: best_d,
                    size: size[keep],
                });
                break;
            }

            chain.push(best);
        }
    }

    merges
}

fn find(parent: &mut [usize], x: usize) -> usize {
    let mut root = x;
    while parent[root] != root {
        root = parent[root];
    }
    // path compression
    let mut node = x;
    while parent[node] != root {
        let next = parent[node];
        parent[node] = root;
        node = next;
    }
    root
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let root_a = find(parent, a);
    let root_b = find(parent, b);
    if root_a != root_b {
        let (low, high) = (root_a.min(root_b), root_a.max(root_b));
        parent[high] = low;
    }
}
