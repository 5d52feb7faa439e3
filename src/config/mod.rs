//! # Config Module
//!
//! Two layers of configuration:
//! - [`Settings`] - the user-tunable values persisted between runs
//! - [`RunConfig`] - everything a single run needs, built once by the caller
//!   and passed to every stage

use crate::error::GrouperError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default aggregation (clustering) threshold
pub const DEFAULT_AGG_THRESHOLD: f64 = 0.11;
/// Default merge threshold for small clusters
pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.15;

/// Persisted user settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Distance below which clusters keep merging
    pub agg_threshold: f64,
    /// Mean distance below which a small cluster is absorbed
    pub merge_threshold: f64,
    /// Whether similar frames are grouped at all
    pub grouping: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            agg_threshold: DEFAULT_AGG_THRESHOLD,
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
            grouping: true,
        }
    }
}

impl Settings {
    /// Load settings from disk.
    ///
    /// A missing, unreadable or malformed file yields the defaults, and so
    /// does a file whose thresholds are out of range.
    pub fn load(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return Self::default(),
        };

        let parsed = serde_json::from_str::<Settings>(&contents)
            .map_err(|e| GrouperError::Config(e.to_string()))
            .and_then(|settings| settings.validate().map(|()| settings));

        match parsed {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed settings file");
                Self::default()
            }
        }
    }

    /// Both thresholds finite and in (0, 1]
    pub fn validate(&self) -> Result<(), GrouperError> {
        check_threshold("agg_threshold", self.agg_threshold)?;
        check_threshold("merge_threshold", self.merge_threshold)
    }

    /// Apply command-line overrides, rejecting values no run can use
    pub fn with_overrides(
        mut self,
        agg_threshold: Option<f64>,
        merge_threshold: Option<f64>,
        grouping: Option<bool>,
    ) -> Result<Self, GrouperError> {
        if let Some(agg) = agg_threshold {
            self.agg_threshold = agg;
        }
        if let Some(merge) = merge_threshold {
            self.merge_threshold = merge;
        }
        if let Some(grouping) = grouping {
            self.grouping = grouping;
        }
        self.validate()?;
        Ok(self)
    }

    /// Save settings, rounding thresholds to four decimals.
    ///
    /// Out-of-range settings are refused so they never reach the next run.
    pub fn save(&self, path: &Path) -> Result<(), GrouperError> {
        let rounded = Settings {
            agg_threshold: round4(self.agg_threshold),
            merge_threshold: round4(self.merge_threshold),
            grouping: self.grouping,
        };
        rounded.validate()?;
        let json = serde_json::to_string_pretty(&rounded)
            .map_err(|e| GrouperError::Config(format!("cannot serialize settings: {e}")))?;
        fs::write(path, json).map_err(|e| {
            GrouperError::Config(format!("cannot write settings to {}: {e}", path.display()))
        })
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Rectangle of a cell used for feature extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl Default for CropRegion {
    /// Top 16x32 of a hairstyle cell
    fn default() -> Self {
        Self::new(0, 0, 16, 32)
    }
}

/// Configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Folder holding the sprite sheets
    pub input_folder: PathBuf,
    /// Root folder of the exported mod
    pub export_root: PathBuf,
    /// Line-delimited list of group names
    pub names_file: PathBuf,
    /// Per-variant metadata template
    pub hair_template: PathBuf,
    /// Manifest template
    pub manifest_template: PathBuf,
    /// Output archive
    pub archive_path: PathBuf,
    /// Folder for debug copies of every group
    pub debug_dir: PathBuf,
    /// Width of one sliced cell
    pub cell_width: u32,
    /// Height of one sliced cell
    pub cell_height: u32,
    /// Region of each cell fed to the feature extractor
    pub feature_crop: CropRegion,
    /// Largest vertical shift tried when comparing two frames
    pub max_shift: usize,
    /// Emit a progress event every this many pairs
    pub progress_interval: usize,
    /// Clusters with at least this many members are merge targets
    pub min_large_size: usize,
    /// Worker threads for the distance engine (None = host parallelism)
    pub workers: Option<usize>,
    pub agg_threshold: f64,
    pub merge_threshold: f64,
    pub grouping: bool,
    /// Copy every group into `debug_dir` for review
    pub debug: bool,
    /// Human-readable mod name written into the manifest
    pub display_name: String,
    /// Seed for name shuffling; random when unset
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_folder: PathBuf::from("hairstyle_sheets"),
            export_root: PathBuf::from("Lapplace Custom Hairs Export"),
            names_file: PathBuf::from("names.txt"),
            hair_template: PathBuf::from("hair.json"),
            manifest_template: PathBuf::from("manifest.json"),
            archive_path: PathBuf::from("Lapplace_Custom_Hairs.zip"),
            debug_dir: PathBuf::from("grouped_hairstyles"),
            cell_width: 16,
            cell_height: 96,
            feature_crop: CropRegion::default(),
            max_shift: 2,
            progress_interval: 100,
            min_large_size: 3,
            workers: None,
            agg_threshold: DEFAULT_AGG_THRESHOLD,
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
            grouping: true,
            debug: false,
            display_name: "Lapplace's Custom Hairs".to_string(),
            seed: None,
        }
    }
}

impl RunConfig {
    /// Apply persisted settings on top of this configuration
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.agg_threshold = settings.agg_threshold;
        self.merge_threshold = settings.merge_threshold;
        self.grouping = settings.grouping;
        self
    }

    /// The settings portion of this configuration
    pub fn settings(&self) -> Settings {
        Settings {
            agg_threshold: self.agg_threshold,
            merge_threshold: self.merge_threshold,
            grouping: self.grouping,
        }
    }

    /// Folder holding the per-variant directories
    pub fn hairs_dir(&self) -> PathBuf {
        self.export_root.join("hairs")
    }

    /// Reject values no stage can work with
    pub fn validate(&self) -> Result<(), GrouperError> {
        self.settings().validate()?;

        if self.cell_width == 0 || self.cell_height == 0 {
            return Err(GrouperError::Config(format!(
                "cell size must be non-zero, got {}x{}",
                self.cell_width, self.cell_height
            )));
        }
        if self.feature_crop.width == 0 || self.feature_crop.height == 0 {
            return Err(GrouperError::Config(format!(
                "feature crop must be non-zero, got {}x{}",
                self.feature_crop.width, self.feature_crop.height
            )));
        }
        if self.progress_interval == 0 {
            return Err(GrouperError::Config(
                "progress interval must be at least 1".to_string(),
            ));
        }
        if self.workers == Some(0) {
            return Err(GrouperError::Config(
                "worker count must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_threshold(name: &str, value: f64) -> Result<(), GrouperError> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(GrouperError::Config(format!(
            "{name} must be in (0, 1], got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_settings_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.agg_threshold, 0.11);
        assert_eq!(settings.merge_threshold, 0.15);
        assert!(settings.grouping);
    }

    #[test]
    fn malformed_settings_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn partial_settings_fill_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"grouping": false}"#).unwrap();

        let settings = Settings::load(&path);
        assert!(!settings.grouping);
        assert_eq!(settings.agg_threshold, DEFAULT_AGG_THRESHOLD);
    }

    #[test]
    fn save_rounds_to_four_decimals() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            agg_threshold: 0.123456,
            merge_threshold: 0.2,
            grouping: false,
        };
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path);
        assert_eq!(loaded.agg_threshold, 0.1235);
        assert_eq!(loaded.merge_threshold, 0.2);
        assert!(!loaded.grouping);
    }

    #[test]
    fn out_of_range_settings_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"agg_threshold": 5.0, "merge_threshold": 0.2, "grouping": false}"#,
        )
        .unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn invalid_overrides_are_rejected_and_never_saved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let result = Settings::default().with_overrides(Some(5.0), None, None);
        assert!(matches!(result, Err(GrouperError::Config(_))));

        let bad = Settings {
            agg_threshold: 5.0,
            ..Settings::default()
        };
        assert!(bad.save(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn valid_overrides_replace_only_given_values() {
        let settings = Settings::default()
            .with_overrides(None, Some(0.3), Some(false))
            .unwrap();
        assert_eq!(settings.agg_threshold, DEFAULT_AGG_THRESHOLD);
        assert_eq!(settings.merge_threshold, 0.3);
        assert!(!settings.grouping);
    }

    #[test]
    fn run_config_takes_settings() {
        let settings = Settings {
            agg_threshold: 0.3,
            merge_threshold: 0.4,
            grouping: false,
        };
        let config = RunConfig::default().with_settings(&settings);
        assert_eq!(config.settings(), settings);
    }

    #[test]
    fn default_run_config_is_valid() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_thresholds() {
        let config = RunConfig {
            agg_threshold: 0.0,
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RunConfig {
            merge_threshold: f64::NAN,
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let config = RunConfig {
            workers: Some(0),
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
