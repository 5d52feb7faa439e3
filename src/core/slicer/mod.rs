//! # Slicer Module
//!
//! Discovers sprite sheets and cuts them into fixed-size cells.
//!
//! ## Rules
//! - Only `*.png` files directly inside the sheet folder are used, in
//!   file-name order
//! - Cells are read row by row, left to right; partial cells at the right
//!   and bottom edges are dropped
//! - Cells whose every pixel is fully transparent are skipped
//! - Each kept cell is written to the working directory as
//!   `{sheet}_r{row}_c{col}.png`

use crate::error::{ComputeError, GrouperError, InputError};
use crate::events::{Event, EventSender, SliceEvent};
use image::{imageops, RgbaImage};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One cell cut from a sheet
#[derive(Debug, Clone)]
pub struct SlicedCell {
    /// Cell image in the working directory
    pub path: PathBuf,
    /// Sheet the cell came from
    pub sheet: PathBuf,
    pub row: u32,
    pub col: u32,
    pub image: RgbaImage,
}

/// Cuts sheets into cells of a fixed size
#[derive(Debug, Clone, Copy)]
pub struct SheetSlicer {
    cell_width: u32,
    cell_height: u32,
}

impl SheetSlicer {
    pub fn new(cell_width: u32, cell_height: u32) -> Self {
        Self {
            cell_width,
            cell_height,
        }
    }

    /// PNG sheets directly inside `folder`, sorted by file name
    pub fn list_sheets(&self, folder: &Path) -> Result<Vec<PathBuf>, InputError> {
        if !folder.is_dir() {
            return Err(InputError::FolderNotFound {
                path: folder.to_path_buf(),
            });
        }

        let mut sheets = Vec::new();
        for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| InputError::ReadDirectory {
                path: folder.to_path_buf(),
                source: e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            })?;

            if entry.file_type().is_file() && is_png(entry.path()) {
                sheets.push(entry.into_path());
            }
        }

        sheets.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(sheets)
    }

    /// Non-transparent cells of `sheet` as (row, col, image)
    pub fn slice(&self, sheet: &RgbaImage) -> Vec<(u32, u32, RgbaImage)> {
        let rows = sheet.height() / self.cell_height;
        let cols = sheet.width() / self.cell_width;
        let mut cells = Vec::new();

        for row in 0..rows {
            for col in 0..cols {
                let cell = imageops::crop_imm(
                    sheet,
                    col * self.cell_width,
                    row * self.cell_height,
                    self.cell_width,
                    self.cell_height,
                )
                .to_image();

                if cell.pixels().all(|p| p.0[3] == 0) {
                    continue;
                }
                cells.push((row, col, cell));
            }
        }

        cells
    }

    /// Slice every sheet of `folder` and save the cells into `work_dir`
    pub fn slice_folder(
        &self,
        folder: &Path,
        work_dir: &Path,
        events: &EventSender,
    ) -> Result<Vec<SlicedCell>, GrouperError> {
        let sheets = self.list_sheets(folder)?;
        events.send(Event::Slice(SliceEvent::Started {
            sheets: sheets.len(),
        }));

        let mut cells = Vec::new();
        for sheet_path in &sheets {
            let sheet = image::open(sheet_path)
                .map_err(|e| ComputeError::DecodeError {
                    path: sheet_path.clone(),
                    reason: e.to_string(),
                })?
                .to_rgba8();

            let file_name = sheet_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let sliced = self.slice(&sheet);
            let count = sliced.len();
            for (row, col, image) in sliced {
                let path = work_dir.join(format!("{file_name}_r{row}_c{col}.png"));
                image.save(&path).map_err(|e| ComputeError::WorkingFile {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                cells.push(SlicedCell {
                    path,
                    sheet: sheet_path.clone(),
                    row,
                    col,
                    image,
                });
            }

            tracing::debug!(sheet = %sheet_path.display(), cells = count, "Sliced sheet");
            events.send(Event::Slice(SliceEvent::SheetSliced {
                path: sheet_path.clone(),
                cells: count,
            }));
        }

        events.send(Event::Slice(SliceEvent::Completed {
            frames: cells.len(),
        }));
        Ok(cells)
    }
}

impl Default for SheetSlicer {
    /// 16x96 hairstyle cells
    fn default() -> Self {
        Self::new(16, 96)
    }
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}
