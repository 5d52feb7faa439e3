//! # CLI Module
//!
//! Command-line interface for the sprite variant grouper.
//!
//! ## Usage
//! ```bash
//! # Group the sheets in ./hairstyle_sheets with the saved settings
//! sprite-group run
//!
//! # Override thresholds (saved for the next run)
//! sprite-group run --agg-threshold 0.09 --merge-threshold 0.2
//!
//! # Export every frame as its own group
//! sprite-group run --grouping false
//!
//! # Show or reset the saved settings
//! sprite-group settings show
//! sprite-group settings reset
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use sprite_variant_grouper::core::pipeline::{Pipeline, PipelineResult};
use sprite_variant_grouper::error::Result;
use sprite_variant_grouper::events::{DistanceEvent, Event, EventChannel, PipelineEvent};
use sprite_variant_grouper::{init_tracing, RunConfig, Settings};
use std::path::{Path, PathBuf};
use std::thread;

/// Sprite Variant Grouper - group look-alike hairstyle frames
#[derive(Parser, Debug)]
#[command(name = "sprite-group")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file
    #[arg(long, global = true, default_value = "settings.json")]
    settings: PathBuf,

    /// Log file (debug records are appended here)
    #[arg(long, global = true, default_value = "log.txt")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Slice, group and export the sprite sheets
    Run(RunArgs),

    /// Inspect or reset the saved settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum SettingsAction {
    /// Print the effective settings
    Show,
    /// Restore the default settings
    Reset,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Folder holding the sprite sheets
    #[arg(short, long, default_value = "hairstyle_sheets")]
    input: PathBuf,

    /// Distance below which clusters keep merging (0-1]
    #[arg(long)]
    agg_threshold: Option<f64>,

    /// Mean distance below which a small cluster is absorbed (0-1]
    #[arg(long)]
    merge_threshold: Option<f64>,

    /// Group similar frames (true) or export every frame on its own (false)
    #[arg(long)]
    grouping: Option<bool>,

    /// Also copy every group into the debug folder
    #[arg(long)]
    debug: bool,

    /// Mod name written into the manifest
    #[arg(long, default_value = "Lapplace's Custom Hairs")]
    name: String,

    /// Line-delimited list of group names
    #[arg(long, default_value = "names.txt")]
    names_file: PathBuf,

    /// Per-variant metadata template
    #[arg(long, default_value = "hair.json")]
    hair_template: PathBuf,

    /// Manifest template
    #[arg(long, default_value = "manifest.json")]
    manifest_template: PathBuf,

    /// Export folder
    #[arg(long, default_value = "Lapplace Custom Hairs Export")]
    export_root: PathBuf,

    /// Output archive
    #[arg(long, default_value = "Lapplace_Custom_Hairs.zip")]
    archive: PathBuf,

    /// Worker threads for the distance computation (default: all cores)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Seed for name shuffling
    #[arg(long)]
    seed: Option<u64>,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(Some(cli.log_file.as_path()));

    match cli.command {
        Commands::Run(args) => run_grouping(&cli.settings, args),
        Commands::Settings { action } => run_settings(&cli.settings, action),
    }
}

fn run_settings(path: &Path, action: SettingsAction) -> Result<()> {
    let term = Term::stdout();
    let settings = match action {
        SettingsAction::Show => Settings::load(path),
        SettingsAction::Reset => {
            let defaults = Settings::default();
            defaults.save(path)?;
            term.write_line(&format!(
                "{} Settings reset in {}",
                style("✓").green().bold(),
                path.display()
            ))
            .ok();
            defaults
        }
    };

    term.write_line(&format!("  agg_threshold    {}", style(settings.agg_threshold).cyan()))
        .ok();
    term.write_line(&format!("  merge_threshold  {}", style(settings.merge_threshold).cyan()))
        .ok();
    term.write_line(&format!("  grouping         {}", style(settings.grouping).cyan()))
        .ok();
    Ok(())
}

fn run_grouping(settings_path: &Path, args: RunArgs) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(args.output, OutputFormat::Pretty);

    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Sprite Variant Grouper").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    // Command-line values win over saved ones and are saved for next time
    let settings = Settings::load(settings_path).with_overrides(
        args.agg_threshold,
        args.merge_threshold,
        args.grouping,
    )?;
    if let Err(e) = settings.save(settings_path) {
        tracing::warn!(error = %e, "Could not save settings");
    }

    let config = RunConfig {
        input_folder: args.input,
        export_root: args.export_root,
        names_file: args.names_file,
        hair_template: args.hair_template,
        manifest_template: args.manifest_template,
        archive_path: args.archive,
        workers: args.workers,
        debug: args.debug,
        display_name: args.name,
        seed: args.seed,
        ..RunConfig::default()
    }
    .with_settings(&settings);

    let pipeline = Pipeline::builder().config(config).build();

    // Set up event handling
    let (sender, receiver) = EventChannel::new();

    // Progress bar for pretty output
    let progress = if pretty {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(phase.to_string());
                }
                Event::Distance(DistanceEvent::Started { total_pairs }) => {
                    pb.set_length(total_pairs as u64);
                    pb.set_position(0);
                }
                Event::Distance(DistanceEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                }
                Event::Distance(DistanceEvent::Completed { total_pairs }) => {
                    pb.set_position(total_pairs as u64);
                }
                Event::Pipeline(PipelineEvent::Finished { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    // Run the pipeline
    let outcome = pipeline.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            term.write_line(&format!("{} Error: {}", style("✗").red().bold(), e))
                .ok();
            return Err(e);
        }
    };

    match args.output {
        OutputFormat::Pretty => print_pretty_results(&term, &result),
        OutputFormat::Json => print_json_results(&result),
    }

    Ok(())
}

fn print_pretty_results(term: &Term, result: &PipelineResult) {
    term.write_line(&format!("{} {}", style("✓").green().bold(), result.message))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} frames grouped in {:.1}s",
        style(result.total_frames).cyan(),
        result.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!("  {} groups", style(result.clusters.len()).cyan()))
        .ok();

    if let Some(merge) = &result.merge {
        term.write_line(&format!(
            "  {} small groups absorbed ({} frames)",
            style(merge.absorbed_clusters()).cyan(),
            merge.absorbed_frames
        ))
        .ok();
    }

    term.write_line(&format!(
        "  Archive: {}",
        style(result.export.archive.display()).yellow()
    ))
    .ok();
    term.write_line("").ok();

    for (cluster, name) in result.clusters.iter().zip(&result.names) {
        term.write_line(&format!(
            "  {} {} {}",
            style(format!("{name}:")).bold(),
            cluster.len(),
            if cluster.len() == 1 { "frame" } else { "frames" }
        ))
        .ok();
    }
}

fn print_json_results(result: &PipelineResult) {
    let output = serde_json::json!({
        "message": result.message,
        "total_frames": result.total_frames,
        "groups": result.clusters.iter().zip(&result.names).map(|(cluster, name)| {
            serde_json::json!({
                "label": cluster.label,
                "name": name,
                "members": cluster.members(),
            })
        }).collect::<Vec<_>>(),
        "absorbed_frames": result.merge.as_ref().map(|m| m.absorbed_frames),
        "unique_id": result.export.unique_id,
        "archive": result.export.archive,
        "duration_ms": result.duration_ms,
    });

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "Failed to serialize results"),
    }
}
