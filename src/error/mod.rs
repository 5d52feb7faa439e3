//! # Error Module
//!
//! Error types for the sprite variant grouper.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, frame indices, what went wrong
//! - **One outcome per run** - every stage error funnels into `GrouperError`
//!   so the pipeline can report a single failure

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum GrouperError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Compute error: {0}")]
    Compute(#[from] ComputeError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors caused by missing or unreadable run inputs
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Sheet folder not found: {path}")]
    FolderNotFound { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read name list {path}: {source}")]
    NameListUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Name list {path} contains no names. Add at least one name per line.")]
    NameListEmpty { path: PathBuf },

    #[error("Name {name:?} in {path} cannot be used as a folder name")]
    NameInvalid { path: PathBuf, name: String },

    #[error("Failed to read template {path}: {source}")]
    TemplateUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template {path} is not a JSON object: {reason}")]
    TemplateInvalid { path: PathBuf, reason: String },
}

/// Errors raised while extracting features or computing distances
#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("Failed to decode bitmap {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Feature arrays have different shapes: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("Feature array {width}x{height} is smaller than the {window}x{window} similarity window")]
    ArrayTooSmall {
        width: usize,
        height: usize,
        window: usize,
    },

    #[error("Distance between frames {i} and {j} is not a finite number")]
    NonFiniteDistance { i: usize, j: usize },

    #[error("Frame index {index} is out of range for {len} frames")]
    FrameOutOfRange { index: usize, len: usize },

    #[error("Failed to write working file {path}: {reason}")]
    WorkingFile { path: PathBuf, reason: String },

    #[error("Worker pool failure: {0}")]
    WorkerPool(String),

    #[error("Cluster set is not a partition: {0}")]
    PartitionViolated(String),
}

/// Errors raised while writing the export tree or archive
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {path}: {reason}")]
    Json { path: PathBuf, reason: String },

    #[error("Failed to build archive {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    #[error("Expected {expected} group names but got {actual}")]
    NameCountMismatch { expected: usize, actual: usize },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, GrouperError>;
