//! # Sprite Variant Grouper
//!
//! Groups near-duplicate hairstyle sprite frames into named variant sets and
//! exports them as an installable mod.
//!
//! ## How It Works
//! Sprite sheets are sliced into cells, each cell becomes a small luminance
//! feature array, every pair of frames is compared with a shift-tolerant
//! SSIM distance, and average-linkage clustering groups frames that look
//! alike. Undersized groups are then folded into a close larger group.
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation layers:
//! - `core` - Slicing, features, distances, clustering, merging, export
//! - `config` - Persisted settings and per-run configuration
//! - `events` - Event-driven progress and completion reporting
//! - `error` - Error taxonomy shared by every stage
//! - `cli` - Command-line interface (binary only)

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use config::{RunConfig, Settings};
pub use error::{GrouperError, Result};

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
/// With `log_file` set, debug records for this crate are appended to that
/// file without colors; `RUST_LOG` still overrides the filter.
pub fn init_tracing(log_file: Option<&Path>) {
    let file = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Cannot open log file {}: {e}", path.display());
                None
            }
        }
    });

    match file {
        Some(file) => {
            let filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sprite_variant_grouper=debug"));
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .expect("Failed to set global default tracing subscriber");
        }
        None => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .expect("Failed to set global default tracing subscriber");
        }
    }
}
