//! # Export Module
//!
//! Writes the final clusters as an installable mod folder and archive.
//!
//! ## Layout
//! ```text
//! <export root>/
//!   manifest.json
//!   hairs/
//!     lch_<name>_v01/hair.png
//!     lch_<name>_v01/hair.json
//!     ...
//! <archive>.zip        every file above, under "<export root name>/"
//! ```
//!
//! With debug enabled every group is also copied to
//! `<debug dir>/<name>/<index>.png`.

use crate::config::RunConfig;
use crate::core::cluster::ClusterSet;
use crate::core::features::SpriteFrame;
use crate::error::{ComputeError, ExportError, GrouperError, InputError};
use crate::events::{Event, EventSender, ExportEvent};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

type JsonObject = Map<String, Value>;

/// Hair and manifest templates, loaded before any work starts
#[derive(Debug, Clone)]
pub struct Templates {
    hair: JsonObject,
    manifest: JsonObject,
}

impl Templates {
    pub fn load(hair: &Path, manifest: &Path) -> Result<Self, InputError> {
        Ok(Self {
            hair: read_object(hair)?,
            manifest: read_object(manifest)?,
        })
    }

    pub fn new(hair: JsonObject, manifest: JsonObject) -> Self {
        Self { hair, manifest }
    }
}

fn read_object(path: &Path) -> Result<JsonObject, InputError> {
    let contents = fs::read_to_string(path).map_err(|e| InputError::TemplateUnreadable {
        path: path.to_path_buf(),
        source: e,
    })?;

    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(InputError::TemplateInvalid {
            path: path.to_path_buf(),
            reason: "top-level value is not an object".to_string(),
        }),
        Err(e) => Err(InputError::TemplateInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// What an export wrote
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Variant directory names, in write order
    pub variants: Vec<String>,
    pub groups: usize,
    pub archive: PathBuf,
    pub unique_id: String,
}

/// Writes clusters to disk
pub struct Exporter<'a> {
    config: &'a RunConfig,
    templates: &'a Templates,
}

impl<'a> Exporter<'a> {
    pub fn new(config: &'a RunConfig, templates: &'a Templates) -> Self {
        Self { config, templates }
    }

    /// Export `clusters`, naming them in label order from `names`
    pub fn export(
        &self,
        clusters: &ClusterSet,
        names: &[String],
        frames: &[SpriteFrame],
        events: &EventSender,
    ) -> Result<ExportSummary, GrouperError> {
        if names.len() != clusters.len() {
            return Err(ExportError::NameCountMismatch {
                expected: clusters.len(),
                actual: names.len(),
            }
            .into());
        }

        let export_root = &self.config.export_root;
        let hairs_dir = self.config.hairs_dir();
        recreate_dir(export_root)?;
        create_dir(&hairs_dir)?;
        if self.config.debug {
            recreate_dir(&self.config.debug_dir)?;
        }

        let unique_id = unique_id();
        let mut manifest = self.templates.manifest.clone();
        manifest.insert(
            "Description".to_string(),
            Value::String(format!(
                "Contains {} hairstyle groups and {} total hairstyles.",
                clusters.len(),
                frames.len()
            )),
        );
        manifest.insert("UniqueID".to_string(), Value::String(unique_id.clone()));
        manifest.insert(
            "Name".to_string(),
            Value::String(format!("[FS][LCH] {}", self.config.display_name)),
        );
        write_json(&export_root.join("manifest.json"), &manifest)?;

        // Clusters handed the same name keep counting where the last one stopped
        let mut counters: HashMap<&str, usize> = HashMap::new();
        let mut variants = Vec::with_capacity(frames.len());

        for (cluster, name) in clusters.iter().zip(names) {
            for &member in cluster.members() {
                let frame = frames.get(member).ok_or(ComputeError::FrameOutOfRange {
                    index: member,
                    len: frames.len(),
                })?;

                let counter = counters.entry(name.as_str()).or_insert(0);
                *counter += 1;
                let idx = *counter;

                let variant = format!("lch_{name}_v{idx:02}");
                let variant_dir = hairs_dir.join(&variant);
                create_dir(&variant_dir)?;
                copy_file(&frame.path, &variant_dir.join("hair.png"))?;

                let mut hair = self.templates.hair.clone();
                hair.insert(
                    "Name".to_string(),
                    Value::String(format!("LCH {} v{idx:02}", display_name(name))),
                );
                write_json(&variant_dir.join("hair.json"), &hair)?;

                if self.config.debug {
                    let group_dir = self.config.debug_dir.join(name);
                    create_dir(&group_dir)?;
                    copy_file(&frame.path, &group_dir.join(format!("{idx}.png")))?;
                }

                events.send(Event::Export(ExportEvent::VariantWritten {
                    name: variant.clone(),
                }));
                variants.push(variant);
            }
        }

        write_archive(export_root, &self.config.archive_path)?;
        events.send(Event::Export(ExportEvent::ArchiveWritten {
            path: self.config.archive_path.clone(),
        }));

        tracing::info!(
            groups = clusters.len(),
            variants = variants.len(),
            archive = %self.config.archive_path.display(),
            "Export written"
        );

        Ok(ExportSummary {
            variants,
            groups: clusters.len(),
            archive: self.config.archive_path.clone(),
            unique_id,
        })
    }
}

/// `"dark_wave"` -> `"Dark wave"`
pub fn display_name(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// `lapplacech.<12 upper-case hex digits>.FS`
pub fn unique_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("lapplacech.{}.FS", hex[..12].to_uppercase())
}

/// Zip every file under `root` into `archive`, prefixed with the root's name
pub fn write_archive(root: &Path, archive: &Path) -> Result<(), ExportError> {
    let archive_err = |reason: String| ExportError::Archive {
        path: archive.to_path_buf(),
        reason,
    };

    let prefix = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file = File::create(archive).map_err(|e| ExportError::Io {
        path: archive.to_path_buf(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| archive_err(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| archive_err(e.to_string()))?;
        let mut name = prefix.clone();
        for component in relative.components() {
            name.push('/');
            name.push_str(&component.as_os_str().to_string_lossy());
        }

        zip.start_file(name, options)
            .map_err(|e| archive_err(e.to_string()))?;
        let mut source = File::open(entry.path()).map_err(|e| ExportError::Io {
            path: entry.path().to_path_buf(),
            source: e,
        })?;
        io::copy(&mut source, &mut zip).map_err(|e| archive_err(e.to_string()))?;
    }

    zip.finish().map_err(|e| archive_err(e.to_string()))?;
    Ok(())
}

fn recreate_dir(path: &Path) -> Result<(), ExportError> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| ExportError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    create_dir(path)
}

fn create_dir(path: &Path) -> Result<(), ExportError> {
    fs::create_dir_all(path).map_err(|e| ExportError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn copy_file(from: &Path, to: &Path) -> Result<(), ExportError> {
    fs::copy(from, to).map(|_| ()).map_err(|e| ExportError::Io {
        path: to.to_path_buf(),
        source: e,
    })
}

fn write_json(path: &Path, object: &JsonObject) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(object).map_err(|e| ExportError::Json {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    fs::write(path, json).map_err(|e| ExportError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
