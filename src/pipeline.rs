//! End-to-end shelf photo processing.
//!
//! One photo flows through segmentation, per-segment OCR, field guessing
//! and catalog matching, producing report rows. Photos are independent, so
//! the run fans out over a rayon pool; result order always follows the
//! sorted input photo order regardless of worker scheduling.

use std::fs;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use indicatif::ProgressBar;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{clean_text, CatalogIndex};
use crate::guess::guess_fields;
use crate::matcher::{find_isbn, match_segment, BaselineCandidate, MatchOptions, MatchStatus};
use crate::ocr::{best_ocr_text, quick_ocr_text, title_hint, OcrSearchOutcome, TextExtractor};
use crate::report::{file_sha256, format_score, ManifestRow, NewBookRow, SegmentRow};
use crate::segment::{crop_segment, detect_spine_segments, SegmentOptions};

/// Pipeline error types
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input directory not found: {0}")]
    InputNotFound(PathBuf),

    #[error("No photos found under {0}")]
    NoPhotos(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Segmentation error: {0}")]
    Segment(#[from] crate::segment::SegmentError),

    #[error("Report error: {0}")]
    Report(#[from] crate::report::ReportError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// JPEG quality for saved segment crops.
const CROP_JPEG_QUALITY: u8 = 90;

/// File extensions accepted as shelf photos.
const PHOTO_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

/// Processing state of one segment as it moves through the stages. Strictly
/// forward; a segment never re-enters an earlier stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SegmentStage {
    Unscanned,
    Segmented,
    OcrDone,
    Guessed,
    Matched,
}

impl SegmentStage {
    /// Advance to `next`, ignoring backwards transitions.
    pub fn advance(&mut self, next: SegmentStage) {
        if next > *self {
            *self = next;
        }
    }
}

/// Tunables for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub segment: SegmentOptions,
    pub matching: MatchOptions,
    /// Coarse title-similarity threshold for the baseline prior.
    pub baseline_threshold: f64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            segment: SegmentOptions::default(),
            matching: MatchOptions::default(),
            baseline_threshold: 0.82,
        }
    }
}

/// Everything produced for one photo.
#[derive(Debug, Default)]
pub struct PhotoOutcome {
    pub segments: Vec<SegmentRow>,
    pub new_books: Vec<NewBookRow>,
    pub manifest: Option<ManifestRow>,
}

/// Aggregated result of a full run.
#[derive(Debug, Default)]
pub struct PipelineRun {
    pub segments: Vec<SegmentRow>,
    pub new_books: Vec<NewBookRow>,
    pub manifest: Vec<ManifestRow>,
    /// Photos skipped because they could not be decoded.
    pub skipped: usize,
}

/// Collect shelf photos under `input`, recursively, in sorted path order.
pub fn collect_photos(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Err(PipelineError::InputNotFound(input.to_path_buf()));
    }
    let mut photos = Vec::new();
    collect_photos_into(input, &mut photos)?;
    photos.sort();
    if photos.is_empty() {
        return Err(PipelineError::NoPhotos(input.to_path_buf()));
    }
    Ok(photos)
}

fn collect_photos_into(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_photos_into(&path, out)?;
        } else if is_photo(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn is_photo(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_lowercase();
            PHOTO_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

fn crop_filename(photo: &Path, index: usize) -> String {
    let stem = photo
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("photo");
    format!("{stem}__seg{index:02}.jpg")
}

fn save_crop(crop: &DynamicImage, path: &Path) -> Result<()> {
    let file = fs::File::create(path)?;
    let mut encoder = JpegEncoder::new_with_quality(file, CROP_JPEG_QUALITY);
    encoder.encode_image(&crop.to_rgb8())?;
    Ok(())
}

/// Process one photo end to end. OCR is skipped (empty text, quality zero)
/// when no extractor is supplied.
pub fn process_photo(
    photo: &Path,
    crops_dir: &Path,
    catalog: &CatalogIndex,
    extractor: Option<&dyn TextExtractor>,
    options: &PipelineOptions,
) -> Result<PhotoOutcome> {
    let photo_name = photo
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let source = image::open(photo)?;
    let gray = source.to_luma8();

    let ranges = detect_spine_segments(&gray, &options.segment)?;
    debug!(photo = %photo_name, segments = ranges.len(), "photo segmented");

    let mut outcome = PhotoOutcome::default();
    for (index, &(x0, x1)) in ranges.iter().enumerate() {
        let mut stage = SegmentStage::Segmented;

        let crop = crop_segment(&source, x0, x1);
        let crop_file = crop_filename(photo, index);
        save_crop(&crop, &crops_dir.join(&crop_file))?;

        // cheap single pass first for the title hint, then the full search
        let (ocr, hint) = match extractor {
            Some(extractor) => {
                let gray_crop = crop.to_luma8();
                let hint = title_hint(&quick_ocr_text(&gray_crop, extractor).text);
                let result = best_ocr_text(&gray_crop, extractor);
                stage.advance(SegmentStage::OcrDone);
                (result, hint)
            }
            None => (
                OcrSearchOutcome {
                    text: String::new(),
                    quality: 0.0,
                    rotation: 0,
                    psm: 0,
                },
                String::new(),
            ),
        };

        let guesses = guess_fields(&ocr.text, catalog);
        stage.advance(SegmentStage::Guessed);

        let baseline =
            similarity_baseline::baseline_candidate(&hint, catalog, options.baseline_threshold);
        let match_text = format!("{hint} {}", ocr.text).trim().to_string();
        let matched = match_segment(&match_text, baseline.as_ref(), catalog, &options.matching);
        stage.advance(SegmentStage::Matched);

        if matched.status == MatchStatus::New {
            let title = if guesses.title.value.is_empty() {
                hint.clone()
            } else {
                guesses.title.value.clone()
            };
            outcome.new_books.push(NewBookRow {
                photo: photo_name.clone(),
                segment: index as u32,
                crop_file: crop_file.clone(),
                title,
                author: guesses.author.value.clone(),
                publisher: guesses.publisher.value.clone(),
                isbn: find_isbn(&match_text).unwrap_or_default(),
                ocr_text: ocr.text.clone(),
            });
        }

        debug!(segment = index, stage = ?stage, "segment complete");
        outcome.segments.push(SegmentRow {
            photo: photo_name.clone(),
            segment: index as u32,
            crop_file,
            ocr_text: ocr.text,
            ocr_quality: format_score(ocr.quality),
            rotation: ocr.rotation,
            psm: ocr.psm,
            guessed_title: guesses.title.value,
            guessed_author: guesses.author.value,
            guessed_publisher: guesses.publisher.value,
            match_status: matched.status.as_str().to_string(),
            match_reason: matched.reason.as_str().to_string(),
            match_score: format_score(matched.score),
            matched_id: matched.matched_id,
            matched_title: matched.matched_title,
        });
    }

    let meta = fs::metadata(photo)?;
    let modified = meta
        .modified()
        .ok()
        .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339())
        .unwrap_or_default();
    outcome.manifest = Some(ManifestRow {
        photo: photo_name,
        bytes: meta.len(),
        modified,
        sha256: file_sha256(photo)?,
        segments: ranges.len() as u32,
    });
    Ok(outcome)
}

/// Run the pipeline over every photo under `input`. Undecodable photos are
/// logged and skipped; any other error aborts the run.
pub fn run(
    input: &Path,
    crops_dir: &Path,
    catalog: &CatalogIndex,
    extractor: Option<&dyn TextExtractor>,
    options: &PipelineOptions,
    progress: Option<&ProgressBar>,
) -> Result<PipelineRun> {
    let photos = collect_photos(input)?;
    fs::create_dir_all(crops_dir)?;
    info!(photos = photos.len(), "pipeline start");

    let outcomes: Vec<Result<Option<PhotoOutcome>>> = photos
        .par_iter()
        .map(|photo| {
            let result = match process_photo(photo, crops_dir, catalog, extractor, options) {
                Ok(outcome) => Ok(Some(outcome)),
                Err(PipelineError::Image(e)) => {
                    warn!(photo = %photo.display(), "skipping undecodable photo: {e}");
                    Ok(None)
                }
                Err(e) => Err(e),
            };
            if let Some(bar) = progress {
                bar.inc(1);
            }
            result
        })
        .collect();

    let mut run = PipelineRun::default();
    for outcome in outcomes {
        match outcome? {
            Some(photo_outcome) => {
                run.segments.extend(photo_outcome.segments);
                run.new_books.extend(photo_outcome.new_books);
                run.manifest.extend(photo_outcome.manifest);
            }
            None => run.skipped += 1,
        }
    }
    info!(
        segments = run.segments.len(),
        new_books = run.new_books.len(),
        skipped = run.skipped,
        "pipeline complete"
    );
    Ok(run)
}

/// Coarse baseline matching against catalog titles, used as the prior for
/// the full matcher.
pub mod similarity_baseline {
    use super::*;
    use crate::matcher::sequence_ratio;

    /// Best catalog title by raw sequence similarity to the hint, if it
    /// clears `threshold`.
    pub fn baseline_candidate(
        hint: &str,
        catalog: &CatalogIndex,
        threshold: f64,
    ) -> Option<BaselineCandidate> {
        let cleaned = clean_text(hint);
        if cleaned.is_empty() {
            return None;
        }
        let mut best: Option<BaselineCandidate> = None;
        for entry in catalog.entries() {
            let score = sequence_ratio(&cleaned, &clean_text(&entry.title));
            if score >= threshold && best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(BaselineCandidate {
                    book_id: entry.id.clone(),
                    score,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use image::{ImageBuffer, Luma, Rgb};

    fn test_catalog() -> CatalogIndex {
        CatalogIndex::build(vec![CatalogEntry {
            id: "7".to_string(),
            title: "Die Blechtrommel".to_string(),
            author: "Günter Grass".to_string(),
            publisher: "dtv".to_string(),
            isbn: "9783423135702".to_string(),
            year: "1959".to_string(),
        }])
    }

    #[test]
    fn test_stage_is_forward_only() {
        let mut stage = SegmentStage::OcrDone;
        stage.advance(SegmentStage::Matched);
        assert_eq!(stage, SegmentStage::Matched);
        stage.advance(SegmentStage::Segmented);
        assert_eq!(stage, SegmentStage::Matched);
    }

    #[test]
    fn test_is_photo() {
        assert!(is_photo(Path::new("a/shelf.JPG")));
        assert!(is_photo(Path::new("b.webp")));
        assert!(!is_photo(Path::new("notes.txt")));
        assert!(!is_photo(Path::new("noext")));
    }

    #[test]
    fn test_crop_filename() {
        assert_eq!(crop_filename(Path::new("/x/shelf_01.jpg"), 3), "shelf_01__seg03.jpg");
    }

    #[test]
    fn test_collect_photos_sorted_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.jpg"), b"x").unwrap();
        fs::write(dir.path().join("sub/a.png"), b"x").unwrap();
        fs::write(dir.path().join("skip.txt"), b"x").unwrap();
        let photos = collect_photos(dir.path()).unwrap();
        assert_eq!(photos.len(), 2);
        assert!(photos[0].ends_with("b.jpg"));
        assert!(photos[1].ends_with("sub/a.png"));
    }

    #[test]
    fn test_collect_photos_missing_dir() {
        let err = collect_photos(Path::new("/nonexistent/fotos")).unwrap_err();
        assert!(matches!(err, PipelineError::InputNotFound(_)));
    }

    #[test]
    fn test_collect_photos_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_photos(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::NoPhotos(_)));
    }

    #[test]
    fn test_baseline_candidate_threshold() {
        let catalog = test_catalog();
        let hit = similarity_baseline::baseline_candidate("Die Blechtrommel", &catalog, 0.82);
        assert_eq!(hit.map(|b| b.book_id), Some("7".to_string()));
        assert!(similarity_baseline::baseline_candidate("Moby Dick", &catalog, 0.82).is_none());
        assert!(similarity_baseline::baseline_candidate("", &catalog, 0.82).is_none());
    }

    #[test]
    fn test_process_photo_without_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let crops = tempfile::tempdir().unwrap();
        let photo = dir.path().join("shelf.png");
        // two wide dark bands on a light background
        let img: image::RgbImage = ImageBuffer::from_fn(300, 100, |x, _| {
            if (20..120).contains(&x) || (180..280).contains(&x) {
                Rgb([10u8, 10, 10])
            } else {
                Rgb([240u8, 240, 240])
            }
        });
        img.save(&photo).unwrap();

        let catalog = test_catalog();
        let options = PipelineOptions {
            segment: SegmentOptions {
                min_seg_width: 50,
                dark_threshold: 128,
                margin: 0,
            },
            ..Default::default()
        };
        let outcome = process_photo(&photo, crops.path(), &catalog, None, &options).unwrap();
        assert_eq!(outcome.segments.len(), 2);
        // unmatched segments are reported even without OCR text
        assert_eq!(outcome.new_books.len(), 2);
        assert!(outcome.new_books[0].title.is_empty());
        assert_eq!(outcome.new_books[1].segment, 1);
        assert!(crops.path().join("shelf__seg00.jpg").exists());
        assert!(crops.path().join("shelf__seg01.jpg").exists());
        let manifest = outcome.manifest.unwrap();
        assert_eq!(manifest.segments, 2);
        assert_eq!(manifest.sha256.len(), 64);
    }

    #[test]
    fn test_run_skips_undecodable_photo() {
        let dir = tempfile::tempdir().unwrap();
        let crops = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.jpg"), b"not a jpeg").unwrap();
        let good: image::GrayImage = ImageBuffer::from_pixel(120, 60, Luma([250u8]));
        good.save(dir.path().join("good.png")).unwrap();

        let catalog = test_catalog();
        let run = run(
            dir.path(),
            crops.path(),
            &catalog,
            None,
            &PipelineOptions::default(),
            None,
        )
        .unwrap();
        assert_eq!(run.skipped, 1);
        assert_eq!(run.manifest.len(), 1);
    }
}
