//! CSV reports written at the end of a pipeline run.
//!
//! Three outputs per run: the per-segment report, the new-book candidate
//! list, and a manifest of the input photos with content hashes so a rerun
//! over unchanged photos is detectable.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

/// Report error types
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;

/// One row of the per-segment report.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentRow {
    pub photo: String,
    pub segment: u32,
    pub crop_file: String,
    pub ocr_text: String,
    pub ocr_quality: String,
    pub rotation: u32,
    pub psm: u8,
    pub guessed_title: String,
    pub guessed_author: String,
    pub guessed_publisher: String,
    pub match_status: String,
    pub match_reason: String,
    pub match_score: String,
    pub matched_id: String,
    pub matched_title: String,
}

/// One row of the new-book candidate list.
#[derive(Debug, Clone, Serialize)]
pub struct NewBookRow {
    pub photo: String,
    pub segment: u32,
    pub crop_file: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub isbn: String,
    pub ocr_text: String,
}

/// One row of the input photo manifest.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestRow {
    pub photo: String,
    pub bytes: u64,
    pub modified: String,
    pub sha256: String,
    pub segments: u32,
}

/// Fixed-precision score formatting shared by all reports.
pub fn format_score(score: f64) -> String {
    format!("{score:.3}")
}

/// SHA-256 of a file's content as lowercase hex.
pub fn file_sha256(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    Ok(out)
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T], what: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), "{what} written");
    Ok(())
}

/// Write the per-segment report.
pub fn write_segment_report(path: &Path, rows: &[SegmentRow]) -> Result<()> {
    write_rows(path, rows, "segment report")
}

/// Write the new-book candidate list.
pub fn write_new_books(path: &Path, rows: &[NewBookRow]) -> Result<()> {
    write_rows(path, rows, "new-book list")
}

/// Write the input photo manifest.
pub fn write_manifest(path: &Path, rows: &[ManifestRow]) -> Result<()> {
    write_rows(path, rows, "photo manifest")
}
