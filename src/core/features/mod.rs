//! # Features Module
//!
//! Turns a sprite cell into a binary "ink" mask.
//!
//! ## How It Works
//! 1. Crop the configured region out of the cell
//! 2. Convert each pixel to 8-bit luminance (ITU-R 601-2 weights)
//! 3. Mark the pixel as ink when luminance > 0.05 and alpha > 0.1
//!
//! Pixels of the crop region that fall outside the bitmap count as
//! transparent, so undersized cells still produce a full-size array.

use crate::config::CropRegion;
use image::RgbaImage;
use std::path::PathBuf;

/// Luminance above which a pixel can be ink (0-1 scale)
pub const LUMA_THRESHOLD: f64 = 0.05;
/// Alpha above which a pixel can be ink (0-1 scale)
pub const ALPHA_THRESHOLD: f64 = 0.1;

/// Stable index of a frame within one run
pub type FrameId = usize;

/// Binary ink mask stored row-major as 0.0 / 1.0
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureArray {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl FeatureArray {
    /// Build from row-major values.
    ///
    /// Returns `None` when `data` does not hold exactly `width * height` values.
    pub fn from_vec(width: usize, height: usize, data: Vec<f64>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// (width, height)
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Value at column `x`, row `y`
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    /// Number of ink pixels
    pub fn ink_count(&self) -> usize {
        self.data.iter().filter(|&&v| v > 0.5).count()
    }
}

/// A sliced frame ready for comparison
#[derive(Debug, Clone)]
pub struct SpriteFrame {
    pub id: FrameId,
    /// Cell image on disk
    pub path: PathBuf,
    pub features: FeatureArray,
}

/// Extracts feature arrays from cell bitmaps
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    crop: CropRegion,
}

impl FeatureExtractor {
    pub fn new(crop: CropRegion) -> Self {
        Self { crop }
    }

    pub fn crop(&self) -> CropRegion {
        self.crop
    }

    /// Extract the ink mask of an in-memory cell
    pub fn extract(&self, image: &RgbaImage) -> FeatureArray {
        let width = self.crop.width as usize;
        let height = self.crop.height as usize;
        let mut data = Vec::with_capacity(width * height);

        for row in 0..self.crop.height {
            for col in 0..self.crop.width {
                let x = self.crop.x + col;
                let y = self.crop.y + row;
                let ink = if x < image.width() && y < image.height() {
                    let [r, g, b, a] = image.get_pixel(x, y).0;
                    is_ink(luminance(r, g, b), a)
                } else {
                    false
                };
                data.push(if ink { 1.0 } else { 0.0 });
            }
        }

        FeatureArray {
            width,
            height,
            data,
        }
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(CropRegion::default())
    }
}

/// 8-bit luminance using fixed-point ITU-R 601-2 weights
fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let l = (r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16;
    l.min(255) as u8
}

fn is_ink(luma: u8, alpha: u8) -> bool {
    luma as f64 / 255.0 > LUMA_THRESHOLD && alpha as f64 / 255.0 > ALPHA_THRESHOLD
}
