//! OCR for spine segments: engine backend, image preprocessing, and the
//! quality-driven parameter search.

pub mod engine;
pub mod optimize;
pub mod preprocess;

pub use engine::{OcrError, RecognitionConfig, TesseractExtractor, TextExtractor, OCR_LANGUAGES};
pub use optimize::{
    best_ocr_text, clean_ocr_text, quality_score, quick_ocr_text, title_hint, OcrSearchOutcome,
    CHAR_BLACKLIST, SEARCH_PSMS,
};
pub use preprocess::{preprocess_variants, Rotation, SEARCH_ROTATIONS};
