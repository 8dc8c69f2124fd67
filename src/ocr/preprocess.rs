//! Image preprocessing variants for the OCR search.
//!
//! Spine photos arrive in every orientation and lighting condition, so the
//! optimizer tries a small, fixed family of rotations and enhancement
//! variants rather than trying to guess the right one up front.

use image::imageops::{self, FilterType};
use image::GrayImage;
use imageproc::contrast::{threshold, ThresholdType};

/// Images whose longest side is below this get upscaled before OCR.
const UPSCALE_MIN_DIM: u32 = 1600;

/// Quarter-turn rotations applied to a segment before recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Clockwise90,
    Half,
    Counter90,
}

/// Rotations in search order. Spine text usually reads bottom-to-top, so
/// the two 90-degree turns come before the upside-down case.
pub const SEARCH_ROTATIONS: [Rotation; 4] = [
    Rotation::None,
    Rotation::Clockwise90,
    Rotation::Counter90,
    Rotation::Half,
];

impl Rotation {
    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Half => 180,
            Rotation::Counter90 => 270,
        }
    }

    pub fn apply(&self, image: &GrayImage) -> GrayImage {
        match self {
            Rotation::None => image.clone(),
            Rotation::Clockwise90 => imageops::rotate90(image),
            Rotation::Half => imageops::rotate180(image),
            Rotation::Counter90 => imageops::rotate270(image),
        }
    }
}

/// Produce the enhancement variants tried for one rotated segment. Each
/// step builds on the previous one: contrast stretch, contrast boost,
/// unsharp mask, then a hard and a mild binarization plus a small closing,
/// all derived from the sharpened image.
pub fn preprocess_variants(image: &GrayImage) -> Vec<GrayImage> {
    let base = upscale_if_small(image);
    let stretched = autocontrast(&base);
    let boosted = boost_contrast(&stretched, 1.8);
    let sharpened = imageops::unsharpen(&boosted, 2.0, 3);
    let binary_hard = threshold(&sharpened, 170, ThresholdType::Binary);
    let binary_mild = threshold(&sharpened, 140, ThresholdType::Binary);
    let closed = min_filter3(&max_filter3(&sharpened));
    vec![stretched, boosted, sharpened, binary_hard, binary_mild, closed]
}

/// Upscale 2x with Lanczos when the image is small for OCR.
fn upscale_if_small(image: &GrayImage) -> GrayImage {
    let max_dim = image.width().max(image.height());
    if max_dim > 0 && max_dim < UPSCALE_MIN_DIM {
        imageops::resize(
            image,
            image.width() * 2,
            image.height() * 2,
            FilterType::Lanczos3,
        )
    } else {
        image.clone()
    }
}

/// Stretch the histogram so actual min/max map to 0/255.
fn autocontrast(image: &GrayImage) -> GrayImage {
    let mut lo = 255u8;
    let mut hi = 0u8;
    for pixel in image.pixels() {
        let v = pixel.0[0];
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if hi <= lo {
        return image.clone();
    }
    let range = (hi - lo) as f32;
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let v = pixel.0[0];
        pixel.0[0] = (((v - lo) as f32 / range) * 255.0).round() as u8;
    }
    out
}

/// Scale pixel distance from the image mean by `factor`.
fn boost_contrast(image: &GrayImage, factor: f32) -> GrayImage {
    let total: u64 = image.pixels().map(|p| p.0[0] as u64).sum();
    let count = (image.width() as u64 * image.height() as u64).max(1);
    let mean = total as f32 / count as f32;
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let v = pixel.0[0] as f32;
        pixel.0[0] = (mean + (v - mean) * factor).clamp(0.0, 255.0) as u8;
    }
    out
}

/// 3x3 maximum filter (grayscale dilation).
fn max_filter3(image: &GrayImage) -> GrayImage {
    neighborhood3(image, |acc, v| acc.max(v), 0)
}

/// 3x3 minimum filter (grayscale erosion).
fn min_filter3(image: &GrayImage) -> GrayImage {
    neighborhood3(image, |acc, v| acc.min(v), 255)
}

fn neighborhood3(image: &GrayImage, fold: impl Fn(u8, u8) -> u8, init: u8) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut out = image.clone();
    for y in 0..height {
        for x in 0..width {
            let mut acc = init;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx >= 0 && ny >= 0 && (nx as u32) < width && (ny as u32) < height {
                        acc = fold(acc, image.get_pixel(nx as u32, ny as u32).0[0]);
                    }
                }
            }
            out.put_pixel(x, y, image::Luma([acc]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};

    #[test]
    fn test_rotation_90_swaps_dimensions() {
        let image: GrayImage = ImageBuffer::new(10, 30);
        let rotated = Rotation::Clockwise90.apply(&image);
        assert_eq!(rotated.dimensions(), (30, 10));
        assert_eq!(Rotation::Half.apply(&image).dimensions(), (10, 30));
    }

    #[test]
    fn test_search_rotation_order() {
        let degrees: Vec<u32> = SEARCH_ROTATIONS.iter().map(|r| r.degrees()).collect();
        assert_eq!(degrees, vec![0, 90, 270, 180]);
    }

    #[test]
    fn test_small_image_upscaled() {
        let image: GrayImage = ImageBuffer::new(100, 300);
        let variants = preprocess_variants(&image);
        assert_eq!(variants.len(), 6);
        assert_eq!(variants[0].dimensions(), (200, 600));
    }

    #[test]
    fn test_large_image_kept_at_size() {
        let image: GrayImage = ImageBuffer::new(400, 1700);
        let variants = preprocess_variants(&image);
        assert_eq!(variants[0].dimensions(), (400, 1700));
    }

    #[test]
    fn test_both_binarizations_emitted() {
        // uniform 150 gray survives the contrast chain unchanged, so the
        // two cuts land on opposite sides of it
        let image: GrayImage = ImageBuffer::from_pixel(1700, 1, Luma([150u8]));
        let variants = preprocess_variants(&image);
        assert_eq!(variants[3].get_pixel(0, 0).0[0], 0);
        assert_eq!(variants[4].get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn test_autocontrast_stretches_to_full_range() {
        let image: GrayImage = ImageBuffer::from_fn(2, 1, |x, _| {
            if x == 0 {
                Luma([100u8])
            } else {
                Luma([150u8])
            }
        });
        let out = autocontrast(&image);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn test_autocontrast_flat_image_unchanged() {
        let image: GrayImage = ImageBuffer::from_pixel(3, 3, Luma([90u8]));
        let out = autocontrast(&image);
        assert_eq!(out.get_pixel(1, 1).0[0], 90);
    }

    #[test]
    fn test_boost_contrast_pushes_away_from_mean() {
        let image: GrayImage = ImageBuffer::from_fn(2, 1, |x, _| {
            if x == 0 {
                Luma([100u8])
            } else {
                Luma([200u8])
            }
        });
        // mean 150: 100 -> 60, 200 -> 240
        let out = boost_contrast(&image, 1.8);
        assert_eq!(out.get_pixel(0, 0).0[0], 60);
        assert_eq!(out.get_pixel(1, 0).0[0], 240);
    }

    #[test]
    fn test_max_then_min_filter_closes_pinhole() {
        let mut image: GrayImage = ImageBuffer::from_pixel(5, 5, Luma([255u8]));
        image.put_pixel(2, 2, Luma([0u8]));
        let closed = min_filter3(&max_filter3(&image));
        assert_eq!(closed.get_pixel(2, 2).0[0], 255);
    }
}
