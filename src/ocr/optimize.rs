//! OCR search over rotations, preprocess variants and engine parameters.
//!
//! For each spine segment we try every combination of rotation, enhancement
//! variant, page segmentation mode and character restriction, score each
//! result with a text-plausibility heuristic, and keep the best. The search
//! space is fixed, so the winner is deterministic for a given extractor.

use std::sync::OnceLock;

use image::GrayImage;
use regex::Regex;
use tracing::debug;

use super::engine::{RecognitionConfig, TextExtractor};
use super::preprocess::{preprocess_variants, Rotation, SEARCH_ROTATIONS};

/// Page segmentation modes tried, roughly "block of text" to "sparse".
pub const SEARCH_PSMS: [u8; 4] = [5, 6, 7, 11];

/// Characters suppressed in the restricted passes. These are almost always
/// misreads on spine photos, never real title text.
pub const CHAR_BLACKLIST: &str = "~`^*_|<>[]\\/";

/// Best result of the OCR search for one segment.
#[derive(Debug, Clone)]
pub struct OcrSearchOutcome {
    pub text: String,
    pub quality: f64,
    pub rotation: u32,
    pub psm: u8,
}

impl OcrSearchOutcome {
    fn empty() -> Self {
        Self {
            text: String::new(),
            quality: 0.0,
            rotation: 0,
            psm: 6,
        }
    }
}

/// Plausibility of an OCR result as real spine text, in `[0, 1]`.
///
/// Weighted mix of letter fraction, vowel fraction among letters, and a
/// saturating length term, all over whitespace-stripped text. Empty text
/// scores zero.
pub fn quality_score(text: &str) -> f64 {
    let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.is_empty() {
        return 0.0;
    }
    let total = chars.len();
    let alpha = chars.iter().filter(|c| c.is_alphabetic()).count();
    let vowels = chars
        .iter()
        .filter(|c| "aeiouäöüAEIOUÄÖÜ".contains(**c))
        .count();
    let alpha_ratio = alpha as f64 / total as f64;
    let vowel_ratio = vowels as f64 / alpha.max(1) as f64;
    let length_term = (total as f64 / 80.0).min(1.0);
    0.55 * alpha_ratio + 0.25 * vowel_ratio + 0.20 * length_term
}

fn whitespace_patterns() -> &'static (Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            Regex::new(r"[ \t]+").unwrap(),
            Regex::new(r"\n{2,}").unwrap(),
        )
    })
}

/// Normalize raw engine output: unify line endings, collapse runs of
/// spaces and blank lines, trim each line.
pub fn clean_ocr_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let (spaces, blank_lines) = whitespace_patterns();
    let collapsed = spaces.replace_all(&unified, " ");
    let lines: Vec<&str> = collapsed.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    blank_lines.replace_all(&joined, "\n").trim().to_string()
}

/// Run the full search and return the best-scoring result. Individual
/// extraction failures are logged and skipped; if every attempt fails the
/// outcome is empty with quality zero.
pub fn best_ocr_text(segment: &GrayImage, extractor: &dyn TextExtractor) -> OcrSearchOutcome {
    let mut best = OcrSearchOutcome::empty();
    for rotation in SEARCH_ROTATIONS {
        let rotated = rotation.apply(segment);
        for variant in preprocess_variants(&rotated) {
            for psm in SEARCH_PSMS {
                for char_blacklist in [None, Some(CHAR_BLACKLIST)] {
                    let config = RecognitionConfig {
                        psm,
                        char_blacklist,
                    };
                    let raw = match extractor.extract(&variant, &config) {
                        Ok(raw) => raw,
                        Err(e) => {
                            debug!(
                                rotation = rotation.degrees(),
                                psm, "OCR attempt failed: {e}"
                            );
                            continue;
                        }
                    };
                    let text = clean_ocr_text(&raw);
                    let quality = quality_score(&text);
                    // strict > keeps the earliest winner on ties
                    if quality > best.quality {
                        best = OcrSearchOutcome {
                            text,
                            quality,
                            rotation: rotation.degrees(),
                            psm,
                        };
                    }
                }
            }
        }
    }
    best
}

/// Single cheap pass, spine rotation only. Seeds the title hint before the
/// full search runs.
pub fn quick_ocr_text(segment: &GrayImage, extractor: &dyn TextExtractor) -> OcrSearchOutcome {
    let rotated = Rotation::Clockwise90.apply(segment);
    let config = RecognitionConfig {
        psm: 6,
        char_blacklist: None,
    };
    match extractor.extract(&rotated, &config) {
        Ok(raw) => {
            let text = clean_ocr_text(&raw);
            let quality = quality_score(&text);
            OcrSearchOutcome {
                text,
                quality,
                rotation: 90,
                psm: 6,
            }
        }
        Err(e) => {
            debug!("quick OCR failed: {e}");
            OcrSearchOutcome::empty()
        }
    }
}

/// Short phrase from the OCR text to seed catalog matching: at the widest
/// span of 2 to 6 consecutive mostly-alphabetic words, the window with the
/// most characters anywhere in the text.
pub fn title_hint(text: &str) -> String {
    let words: Vec<&str> = text
        .split_whitespace()
        .filter(|w| {
            let alpha = w.chars().filter(|c| c.is_alphabetic()).count();
            alpha * 2 >= w.chars().count() && alpha >= 2
        })
        .collect();
    if words.is_empty() {
        return String::new();
    }
    for span in (2..=6usize).rev() {
        if words.len() < span {
            continue;
        }
        let mut best = String::new();
        for window in words.windows(span) {
            let cand = window.join(" ");
            // strict > keeps the earliest window on ties
            if cand.chars().count() > best.chars().count() {
                best = cand;
            }
        }
        return best;
    }
    words[0].to_string()
}
