//! Pipeline execution implementation.

use crate::config::RunConfig;
use crate::core::cluster::{ClusterBuilder, ClusterSet};
use crate::core::distance::{DistanceEngine, FrameDistances, ShiftedSsim};
use crate::core::export::{ExportSummary, Exporter, Templates};
use crate::core::features::{FeatureExtractor, SpriteFrame};
use crate::core::merge::{MergeReport, MergeResolver};
use crate::core::naming::NameList;
use crate::core::slicer::SheetSlicer;
use crate::error::{ComputeError, GrouperError};
use crate::events::{
    null_sender, ClusterEvent, Event, EventSender, PipelineEvent, PipelinePhase,
};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

/// Result of pipeline execution
#[derive(Debug)]
pub struct PipelineResult {
    /// Final clusters, after merging
    pub clusters: ClusterSet,
    /// Group names, one per cluster in label order
    pub names: Vec<String>,
    /// Total frames sliced from the sheets
    pub total_frames: usize,
    /// Merge pass summary (None when grouping is disabled)
    pub merge: Option<MergeReport>,
    /// What the export wrote
    pub export: ExportSummary,
    /// Outcome message sent with the completion event
    pub message: String,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: RunConfig,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
        }
    }

    /// Replace the whole run configuration
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Folder holding the sprite sheets
    pub fn input_folder(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input_folder = path.into();
        self
    }

    /// Export root and archive locations
    pub fn output(mut self, export_root: impl Into<PathBuf>, archive: impl Into<PathBuf>) -> Self {
        self.config.export_root = export_root.into();
        self.config.archive_path = archive.into();
        self
    }

    /// Name list file
    pub fn names_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.names_file = path.into();
        self
    }

    /// Hair and manifest template files
    pub fn templates(mut self, hair: impl Into<PathBuf>, manifest: impl Into<PathBuf>) -> Self {
        self.config.hair_template = hair.into();
        self.config.manifest_template = manifest.into();
        self
    }

    /// Aggregation and merge thresholds
    pub fn thresholds(mut self, agg: f64, merge: f64) -> Self {
        self.config.agg_threshold = agg;
        self.config.merge_threshold = merge;
        self
    }

    /// Enable or disable grouping
    pub fn grouping(mut self, grouping: bool) -> Self {
        self.config.grouping = grouping;
        self
    }

    /// Write debug copies of every group
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Worker threads for the distance engine
    pub fn workers(mut self, workers: Option<usize>) -> Self {
        self.config.workers = workers;
        self
    }

    /// Seed name shuffling for reproducible runs
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The sprite grouping pipeline
pub struct Pipeline {
    config: RunConfig,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run the pipeline without events
    pub fn run(&self) -> Result<PipelineResult, GrouperError> {
        self.run_with_events(&null_sender())
    }

    /// Run the pipeline with event reporting.
    ///
    /// `PipelineEvent::Finished` is sent exactly once, whether the run
    /// succeeds or fails.
    pub fn run_with_events(&self, events: &EventSender) -> Result<PipelineResult, GrouperError> {
        let start_time = Instant::now();
        events.send(Event::Pipeline(PipelineEvent::Started));

        let outcome = self.execute(events, start_time);

        match &outcome {
            Ok(result) => {
                tracing::info!(
                    frames = result.total_frames,
                    groups = result.clusters.len(),
                    duration_ms = result.duration_ms,
                    "{}",
                    result.message
                );
                events.send(Event::Pipeline(PipelineEvent::Finished {
                    success: true,
                    message: result.message.clone(),
                }));
            }
            Err(e) => {
                tracing::error!(error = %error_chain(e), "Run failed");
                events.send(Event::Pipeline(PipelineEvent::Finished {
                    success: false,
                    message: format!("Error: {e}"),
                }));
            }
        }

        outcome
    }

    fn execute(
        &self,
        events: &EventSender,
        start_time: Instant,
    ) -> Result<PipelineResult, GrouperError> {
        let config = &self.config;
        config.validate()?;

        // Every input is read before any output is touched
        let names = NameList::load(&config.names_file)?;
        let templates = Templates::load(&config.hair_template, &config.manifest_template)?;

        let work_dir = tempfile::Builder::new()
            .prefix("sprite-cells-")
            .tempdir()
            .map_err(|e| ComputeError::WorkingFile {
                path: std::env::temp_dir(),
                reason: e.to_string(),
            })?;

        // Phase 1: Slicing
        phase(events, PipelinePhase::Slicing);
        let slicer = SheetSlicer::new(config.cell_width, config.cell_height);
        let cells = slicer.slice_folder(&config.input_folder, work_dir.path(), events)?;
        tracing::info!(frames = cells.len(), "Sliced sprite sheets");

        // Phase 2: Extracting
        phase(events, PipelinePhase::Extracting);
        let extractor = FeatureExtractor::new(config.feature_crop);
        let frames: Vec<SpriteFrame> = cells
            .into_par_iter()
            .enumerate()
            .map(|(id, cell)| SpriteFrame {
                id,
                features: extractor.extract(&cell.image),
                path: cell.path,
            })
            .collect();

        let (clusters, merge) = if config.grouping {
            let distances = FrameDistances::new(&frames, ShiftedSsim::new(config.max_shift));

            // Phase 3: Measuring
            phase(events, PipelinePhase::Measuring);
            let engine = DistanceEngine::new(config.workers, config.progress_interval);
            let matrix = engine.compute(&distances, events)?;
            tracing::info!(frames = matrix.len(), workers = engine.worker_count(), "Distance matrix built");

            // Phase 4: Clustering
            phase(events, PipelinePhase::Clustering);
            let clusters = ClusterBuilder::new(config.agg_threshold).build(&matrix);
            events.send(Event::Cluster(ClusterEvent::Completed {
                clusters: clusters.len(),
            }));
            tracing::info!(clusters = clusters.len(), "Clusters formed");

            // Phase 5: Merging
            phase(events, PipelinePhase::Merging);
            let resolver = MergeResolver::new(config.merge_threshold, config.min_large_size);
            let (clusters, report) = resolver.resolve(clusters, &distances, events)?;
            tracing::info!(
                absorbed = report.absorbed_clusters(),
                clusters = clusters.len(),
                "Small clusters resolved"
            );
            (clusters, Some(report))
        } else {
            (ClusterSet::singletons(frames.len()), None)
        };

        // Phase 6: Exporting
        phase(events, PipelinePhase::Exporting);
        let group_names = names.assign_seeded(clusters.len(), config.seed);
        let export = Exporter::new(config, &templates).export(&clusters, &group_names, &frames, events)?;

        if let Err(e) = work_dir.close() {
            tracing::warn!(error = %e, "Failed to remove working directory");
        }

        let message = format!(
            "Finished clustering {} hairstyles into {} groups.",
            frames.len(),
            clusters.len()
        );

        Ok(PipelineResult {
            clusters,
            names: group_names,
            total_frames: frames.len(),
            merge,
            export,
            message,
            duration_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}

fn phase(events: &EventSender, phase: PipelinePhase) {
    tracing::debug!(%phase, "Entering phase");
    events.send(Event::Pipeline(PipelineEvent::PhaseChanged { phase }));
}

/// `outer: inner: root` rendering of an error and its sources
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventChannel;
    use crate::error::InputError;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn pipeline_in(dir: &Path) -> PipelineBuilder {
        fs::create_dir_all(dir.join("sheets")).unwrap();
        fs::write(dir.join("names.txt"), "aurora\nbramble\n").unwrap();
        fs::write(dir.join("hair.json"), r#"{"Name": ""}"#).unwrap();
        fs::write(dir.join("manifest.json"), r#"{"Name": ""}"#).unwrap();

        Pipeline::builder()
            .input_folder(dir.join("sheets"))
            .output(dir.join("export"), dir.join("export.zip"))
            .names_file(dir.join("names.txt"))
            .templates(dir.join("hair.json"), dir.join("manifest.json"))
            .seed(1)
    }

    fn finished_events(events: &[Event]) -> Vec<(bool, String)> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Pipeline(PipelineEvent::Finished { success, message }) => {
                    Some((*success, message.clone()))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn pipeline_builder_creates_pipeline() {
        let pipeline = Pipeline::builder()
            .thresholds(0.2, 0.3)
            .grouping(false)
            .workers(Some(2))
            .build();

        assert_eq!(pipeline.config().agg_threshold, 0.2);
        assert_eq!(pipeline.config().merge_threshold, 0.3);
        assert!(!pipeline.config().grouping);
        assert_eq!(pipeline.config().workers, Some(2));
    }

    #[test]
    fn pipeline_handles_empty_sheet_folder() {
        let dir = TempDir::new().unwrap();
        let result = pipeline_in(dir.path()).build().run().unwrap();

        assert_eq!(result.total_frames, 0);
        assert!(result.clusters.is_empty());
        assert_eq!(result.message, "Finished clustering 0 hairstyles into 0 groups.");
        assert!(dir.path().join("export.zip").exists());
    }

    #[test]
    fn invalid_config_reports_a_single_failure() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(dir.path()).thresholds(0.0, 0.15).build();
        let (sender, receiver) = EventChannel::new();

        let result = pipeline.run_with_events(&sender);
        drop(sender);

        assert!(matches!(result, Err(GrouperError::Config(_))));
        let events: Vec<_> = receiver.iter().collect();
        let finished = finished_events(&events);
        assert_eq!(finished.len(), 1);
        assert!(!finished[0].0);
        assert!(finished[0].1.starts_with("Error: "));
    }

    #[test]
    fn missing_name_list_fails_before_export() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(dir.path())
            .names_file(dir.path().join("absent.txt"))
            .build();

        let result = pipeline.run();
        assert!(matches!(
            result,
            Err(GrouperError::Input(InputError::NameListUnreadable { .. }))
        ));
        assert!(!dir.path().join("export").exists());
    }

    #[test]
    fn error_chain_includes_sources() {
        let error: GrouperError = InputError::NameListUnreadable {
            path: PathBuf::from("names.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        }
        .into();
        let chain = error_chain(&error);
        assert!(chain.contains("names.txt"));
        assert!(chain.ends_with("gone"));
    }
}
