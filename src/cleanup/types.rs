//! Record types for the cleanup and quarantine passes.
//!
//! The export these passes consume is a flat CSV with one row per copy;
//! rows sharing a `book_id` are regrouped into one [`BookRecord`] with its
//! copies attached.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cleanup error types
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Export not found: {0}")]
    ExportNotFound(String),
}

pub type Result<T> = std::result::Result<T, CleanupError>;

/// One physical copy of a book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CopyRecord {
    pub id: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub digitization_status: String,
    #[serde(default)]
    pub cover_local: String,
    #[serde(default)]
    pub cover_online: String,
}

/// One book with all of its copies.
#[derive(Debug, Clone, Default)]
pub struct BookRecord {
    pub id: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub isbn10: String,
    pub isbn13: String,
    pub year: Option<i32>,
    pub copies: Vec<CopyRecord>,
}

/// One row of the flat per-copy export CSV.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportRow {
    pub book_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub isbn10: String,
    #[serde(default)]
    pub isbn13: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub copy_id: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub cover_local: String,
    #[serde(default)]
    pub cover_online: String,
}

/// Group flat export rows into books, preserving first-seen book order.
pub fn group_rows(rows: Vec<ExportRow>) -> Vec<BookRecord> {
    let mut order: Vec<String> = Vec::new();
    let mut books: HashMap<String, BookRecord> = HashMap::new();

    for row in rows {
        if row.book_id.is_empty() {
            continue;
        }
        let book = books.entry(row.book_id.clone()).or_insert_with(|| {
            order.push(row.book_id.clone());
            BookRecord {
                id: row.book_id.clone(),
                title: row.title.clone(),
                author: row.author.clone(),
                publisher: row.publisher.clone(),
                isbn10: row.isbn10.clone(),
                isbn13: row.isbn13.clone(),
                year: row.year.trim().parse().ok(),
                copies: Vec::new(),
            }
        });
        if !row.copy_id.is_empty() {
            book.copies.push(CopyRecord {
                id: row.copy_id,
                signature: row.signature,
                digitization_status: row.status,
                cover_local: row.cover_local,
                cover_online: row.cover_online,
            });
        }
    }

    order
        .into_iter()
        .filter_map(|id| books.remove(&id))
        .collect()
}

/// Load and group the per-copy export CSV.
pub fn load_export_csv(path: &Path) -> Result<Vec<BookRecord>> {
    if !path.exists() {
        return Err(CleanupError::ExportNotFound(path.display().to_string()));
    }
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: ExportRow = record?;
        rows.push(row);
    }
    Ok(group_rows(rows))
}
