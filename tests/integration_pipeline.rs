//! Integration tests for the pipeline module.
//!
//! These tests verify end-to-end pipeline behavior including:
//! - Grouping look-alike frames from synthetic sheets
//! - Grouping disabled
//! - Missing inputs and the single completion event
//! - The exported folder and archive

use image::{Rgba, RgbaImage};
use sprite_variant_grouper::core::pipeline::{Pipeline, PipelineBuilder};
use sprite_variant_grouper::error::{GrouperError, InputError};
use sprite_variant_grouper::events::{Event, EventChannel, PipelineEvent, PipelinePhase};
use std::fs::{self, File};
use std::path::Path;
use tempfile::TempDir;

const INK: Rgba<u8> = Rgba([200, 150, 100, 255]);

/// Paint one 16x96 cell at column `col` of `sheet`
fn paint_cell(sheet: &mut RgbaImage, col: u32, ink: impl Fn(u32, u32) -> bool) {
    for y in 0..96 {
        for x in 0..16 {
            if ink(x, y) {
                sheet.put_pixel(col * 16 + x, y, INK);
            }
        }
    }
}

/// Vertical bar, shifted down by `dy` rows
fn bar(dy: u32) -> impl Fn(u32, u32) -> bool {
    move |x, y| (4..8).contains(&x) && (4 + dy..28 + dy).contains(&y)
}

/// Nearly filled cell with a hole away from the bar
fn filled(x: u32, y: u32) -> bool {
    y < 32 && !((10..14).contains(&x) && (4..28).contains(&y))
}

/// Sheet layout: bar, bar+1, bar+2, filled, empty
fn write_sheet(dir: &Path) {
    let mut sheet = RgbaImage::from_pixel(80, 96, Rgba([0, 0, 0, 0]));
    paint_cell(&mut sheet, 0, bar(0));
    paint_cell(&mut sheet, 1, bar(1));
    paint_cell(&mut sheet, 2, bar(2));
    paint_cell(&mut sheet, 3, filled);
    sheet.save(dir.join("hairs.png")).unwrap();
}

fn setup(dir: &Path) -> PipelineBuilder {
    let sheets = dir.join("hairstyle_sheets");
    fs::create_dir_all(&sheets).unwrap();
    write_sheet(&sheets);
    fs::write(dir.join("names.txt"), "aurora\nbramble\ncinder\n").unwrap();
    fs::write(dir.join("hair.json"), r#"{"Name": "", "Gender": "Any"}"#).unwrap();
    fs::write(dir.join("manifest.json"), r#"{"Name": "", "Author": "Lapplace"}"#).unwrap();

    Pipeline::builder()
        .input_folder(sheets)
        .output(dir.join("Lapplace Custom Hairs Export"), dir.join("hairs.zip"))
        .names_file(dir.join("names.txt"))
        .templates(dir.join("hair.json"), dir.join("manifest.json"))
        .workers(Some(2))
        .seed(7)
}

#[test]
fn shifted_frames_are_grouped_together() {
    let dir = TempDir::new().unwrap();
    let result = setup(dir.path()).build().run().unwrap();

    assert_eq!(result.total_frames, 4);
    assert_eq!(result.clusters.len(), 2);
    assert!(result.clusters.check_partition(4).is_ok());

    let members: Vec<Vec<usize>> = result
        .clusters
        .iter()
        .map(|c| c.members().to_vec())
        .collect();
    assert_eq!(members, vec![vec![0, 1, 2], vec![3]]);
    assert_eq!(
        result.message,
        "Finished clustering 4 hairstyles into 2 groups."
    );
}

#[test]
fn grouping_disabled_exports_every_frame_alone() {
    let dir = TempDir::new().unwrap();
    let result = setup(dir.path()).grouping(false).build().run().unwrap();

    assert_eq!(result.clusters.len(), 4);
    assert!(result.clusters.iter().all(|c| c.len() == 1));
    assert!(result.merge.is_none());
    // 4 groups from 3 names: every name is used, one of them twice
    assert_eq!(result.names.len(), 4);
    for name in ["aurora", "bramble", "cinder"] {
        assert!(result.names.iter().any(|n| n == name));
    }
}

#[test]
fn grouping_disabled_ignores_thresholds() {
    let mut outcomes = Vec::new();
    for (agg, merge) in [(0.01, 0.01), (1.0, 1.0)] {
        let dir = TempDir::new().unwrap();
        let result = setup(dir.path())
            .grouping(false)
            .thresholds(agg, merge)
            .build()
            .run()
            .unwrap();
        let members: Vec<Vec<usize>> = result
            .clusters
            .iter()
            .map(|c| c.members().to_vec())
            .collect();
        outcomes.push(members);
    }

    assert_eq!(outcomes[0], vec![vec![0], vec![1], vec![2], vec![3]]);
    assert_eq!(outcomes[0], outcomes[1]);
}

#[test]
fn export_tree_and_archive_are_written() {
    let dir = TempDir::new().unwrap();
    let result = setup(dir.path()).build().run().unwrap();

    let export_root = dir.path().join("Lapplace Custom Hairs Export");
    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(export_root.join("manifest.json")).unwrap())
            .unwrap();
    assert_eq!(
        manifest["Description"],
        "Contains 2 hairstyle groups and 4 total hairstyles."
    );
    assert_eq!(manifest["Author"], "Lapplace");

    let variant_dirs = fs::read_dir(export_root.join("hairs")).unwrap().count();
    assert_eq!(variant_dirs, 4);
    assert_eq!(result.export.variants.len(), 4);
    for variant in &result.export.variants {
        let dir = export_root.join("hairs").join(variant);
        assert!(dir.join("hair.png").exists());
        assert!(dir.join("hair.json").exists());
    }

    let archive = zip::ZipArchive::new(File::open(dir.path().join("hairs.zip")).unwrap()).unwrap();
    assert_eq!(archive.len(), 9);
    assert!(archive
        .file_names()
        .all(|name| name.starts_with("Lapplace Custom Hairs Export/")));
}

#[test]
fn missing_sheet_folder_reports_one_failure() {
    let dir = TempDir::new().unwrap();
    let pipeline = setup(dir.path())
        .input_folder(dir.path().join("nowhere"))
        .build();
    let (sender, receiver) = EventChannel::new();

    let result = pipeline.run_with_events(&sender);
    drop(sender);

    assert!(matches!(
        result,
        Err(GrouperError::Input(InputError::FolderNotFound { .. }))
    ));

    let finished: Vec<_> = receiver
        .iter()
        .filter_map(|event| match event {
            Event::Pipeline(PipelineEvent::Finished { success, message }) => {
                Some((success, message))
            }
            _ => None,
        })
        .collect();
    assert_eq!(finished.len(), 1);
    assert!(!finished[0].0);
    assert!(finished[0].1.starts_with("Error: "));
}

#[test]
fn phases_are_reported_in_order() {
    let dir = TempDir::new().unwrap();
    let pipeline = setup(dir.path()).build();
    let (sender, receiver) = EventChannel::new();

    pipeline.run_with_events(&sender).unwrap();
    drop(sender);

    let phases: Vec<PipelinePhase> = receiver
        .iter()
        .filter_map(|event| match event {
            Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => Some(phase),
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![
            PipelinePhase::Slicing,
            PipelinePhase::Extracting,
            PipelinePhase::Measuring,
            PipelinePhase::Clustering,
            PipelinePhase::Merging,
            PipelinePhase::Exporting,
        ]
    );
}

#[test]
fn empty_name_list_fails_the_run() {
    let dir = TempDir::new().unwrap();
    let builder = setup(dir.path());
    fs::write(dir.path().join("names.txt"), "\n\n").unwrap();

    let result = builder.build().run();
    assert!(matches!(
        result,
        Err(GrouperError::Input(InputError::NameListEmpty { .. }))
    ));
}
