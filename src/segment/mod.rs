//! Spine segmentation by vertical column projection.
//!
//! # Algorithm
//!
//! 1. Count dark pixels per column over the usable width (margins excluded)
//! 2. Take the 20th percentile of all column counts as a dynamic gap
//!    threshold: columns at or below it are background gaps between spines
//! 3. Contiguous ink runs wide enough become segments, left to right
//! 4. If nothing qualifies, the whole image is one segment
//!
//! The result is deterministic for fixed parameters and pixels; a non-empty
//! image always yields at least one segment.

use image::{DynamicImage, GrayImage};
use thiserror::Error;

/// Percentile of column dark counts used as the gap threshold.
pub const GAP_PERCENTILE: f64 = 20.0;

/// Segmentation error types
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

pub type Result<T> = std::result::Result<T, SegmentError>;

/// Options for spine segmentation
#[derive(Debug, Clone)]
pub struct SegmentOptions {
    /// Minimum width of a segment in pixels
    pub min_seg_width: u32,
    /// Gray value below which a pixel counts as dark (0-255)
    pub dark_threshold: u8,
    /// Columns ignored on each side of the image
    pub margin: u32,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            min_seg_width: 80,
            dark_threshold: 180,
            margin: 6,
        }
    }
}

/// Detect spine segments as `(start_x, end_x)` column ranges, ordered left
/// to right. Guaranteed non-empty for any image with non-zero dimensions.
pub fn detect_spine_segments(
    image: &GrayImage,
    options: &SegmentOptions,
) -> Result<Vec<(u32, u32)>> {
    let width = image.width();
    let height = image.height();
    if width == 0 || height == 0 {
        return Err(SegmentError::InvalidImage(
            "image has zero dimensions".to_string(),
        ));
    }

    let (x0, x1) = if width > options.margin * 2 {
        (options.margin, width - options.margin)
    } else {
        (0, width)
    };

    // dark-pixel projection per usable column
    let mut dark_counts = Vec::with_capacity((x1 - x0) as usize);
    for x in x0..x1 {
        let mut dark = 0u32;
        for y in 0..height {
            if image.get_pixel(x, y).0[0] < options.dark_threshold {
                dark += 1;
            }
        }
        dark_counts.push(dark);
    }

    let gap_threshold = percentile(&dark_counts, GAP_PERCENTILE);

    let mut segments = Vec::new();
    let mut run_start: Option<u32> = None;
    for (i, &dark) in dark_counts.iter().enumerate() {
        let is_gap = (dark as f64) <= gap_threshold;
        if is_gap {
            if let Some(start) = run_start.take() {
                let sx = x0 + start;
                let ex = x0 + i as u32;
                if ex - sx >= options.min_seg_width {
                    segments.push((sx, ex));
                }
            }
        } else if run_start.is_none() {
            run_start = Some(i as u32);
        }
    }
    if let Some(start) = run_start {
        let sx = x0 + start;
        let ex = x0 + dark_counts.len() as u32;
        if ex - sx >= options.min_seg_width {
            segments.push((sx, ex));
        }
    }

    // whole-image fallback keeps the ">= 1 segment" guarantee
    if segments.is_empty() {
        segments.push((0, width));
    }

    Ok(segments)
}

/// Crop one segment out of the source photo at full photo height.
pub fn crop_segment(image: &DynamicImage, x0: u32, x1: u32) -> DynamicImage {
    let height = image.height();
    image.crop_imm(x0, 0, x1.saturating_sub(x0), height)
}

/// Percentile with linear interpolation between order statistics.
fn percentile(values: &[u32], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<u32> = values.to_vec();
    sorted.sort_unstable();
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower] as f64
    } else {
        let weight = rank - lower as f64;
        sorted[lower] as f64 * (1.0 - weight) + sorted[upper] as f64 * weight
    }
}
