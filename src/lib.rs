//! spinescan: bookshelf photo scanner and catalog reconciler.
//!
//! Takes photos of full bookshelves, cuts them into single-spine crops,
//! runs an OCR parameter search per spine, guesses title/author/publisher
//! fields, and reconciles every spine against a catalog snapshot. Separate
//! hygiene passes delete or quarantine catalog records that earlier OCR
//! imports filled with garbage.
//!
//! # Pipeline
//!
//! photo -> [`segment`] -> [`ocr`] -> [`guess`] -> [`matcher`] -> [`report`]
//!
//! The catalog is read-only throughout a scan; only the [`cleanup`] passes
//! modify it, and only through the [`cleanup::CatalogStore`] seam.

pub mod catalog;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod gibberish;
pub mod guess;
pub mod matcher;
pub mod metadata;
pub mod ocr;
pub mod pipeline;
pub mod report;
pub mod segment;

pub use catalog::{load_catalog_csv, CatalogEntry, CatalogIndex};
pub use config::{CliOverrides, Config};
pub use gibberish::{gibberish_score, looks_gibberish, GibberishOptions};
pub use matcher::{match_segment, BaselineCandidate, MatchOptions, MatchOutcome, MatchStatus};
pub use ocr::{best_ocr_text, TesseractExtractor, TextExtractor};
pub use pipeline::{PipelineOptions, PipelineRun};
pub use segment::{detect_spine_segments, SegmentOptions};

/// Exit codes used by the command-line interface.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INPUT_NOT_FOUND: i32 = 2;
}
