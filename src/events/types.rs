//! Event type definitions for progress and completion reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the grouping pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Sheet slicing events
    Slice(SliceEvent),
    /// Pairwise distance events
    Distance(DistanceEvent),
    /// Cluster builder events
    Cluster(ClusterEvent),
    /// Merge resolver events
    Merge(MergeEvent),
    /// Export events
    Export(ExportEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during sheet slicing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SliceEvent {
    /// Slicing has started
    Started { sheets: usize },
    /// One sheet was cut into cells
    SheetSliced { path: PathBuf, cells: usize },
    /// Slicing completed
    Completed { frames: usize },
}

/// Events during the pairwise distance computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DistanceEvent {
    /// Distance computation has started
    Started { total_pairs: usize },
    /// Progress update, emitted at a fixed pair cadence
    Progress(DistanceProgress),
    /// Every pair has been collected
    Completed { total_pairs: usize },
}

/// Progress information during the distance computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceProgress {
    /// Number of pairs collected so far
    pub completed: usize,
    /// Total number of pairs
    pub total: usize,
}

impl DistanceProgress {
    /// Completion as a whole percentage
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            return 100;
        }
        self.completed * 100 / self.total
    }
}

/// Events from the cluster builder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClusterEvent {
    /// Initial clusters were formed
    Completed { clusters: usize },
}

/// Events from the merge resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MergeEvent {
    /// A small cluster was absorbed into a large one
    Absorbed {
        small: usize,
        into: usize,
        mean_distance: f64,
    },
    /// A small cluster stayed on its own
    Kept {
        small: usize,
        best_distance: Option<f64>,
    },
    /// Merging finished
    Completed {
        absorbed_frames: usize,
        clusters: usize,
    },
}

/// Events from the export stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExportEvent {
    /// A variant folder was written
    VariantWritten { name: String },
    /// The archive was written
    ArchiveWritten { path: PathBuf },
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Final outcome of the run, emitted exactly once
    Finished { success: bool, message: String },
}

/// Phases of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Slicing,
    Extracting,
    Measuring,
    Clustering,
    Merging,
    Exporting,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Slicing => write!(f, "Slicing sheets"),
            PipelinePhase::Extracting => write!(f, "Extracting features"),
            PipelinePhase::Measuring => write!(f, "Computing distances"),
            PipelinePhase::Clustering => write!(f, "Clustering"),
            PipelinePhase::Merging => write!(f, "Merging small groups"),
            PipelinePhase::Exporting => write!(f, "Exporting"),
        }
    }
}
