//! CSV-backed [`CatalogStore`]: removal rewrites the export file without
//! the flagged books' rows.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::types::{CleanupError, ExportRow, Result};
use super::CatalogStore;

pub struct CsvCatalogStore {
    path: PathBuf,
}

impl CsvCatalogStore {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CleanupError::ExportNotFound(path.display().to_string()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl CatalogStore for CsvCatalogStore {
    fn delete_books(&mut self, ids: &[String]) -> Result<usize> {
        let flagged: HashSet<&str> = ids.iter().map(String::as_str).collect();

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;
        let mut kept: Vec<ExportRow> = Vec::new();
        let mut removed_books: HashSet<String> = HashSet::new();
        for record in reader.deserialize() {
            let row: ExportRow = record?;
            if flagged.contains(row.book_id.as_str()) {
                removed_books.insert(row.book_id.clone());
            } else {
                kept.push(row);
            }
        }

        // write to a sibling temp file, then replace atomically
        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            for row in &kept {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;

        info!(
            removed = removed_books.len(),
            kept = kept.len(),
            "catalog rewritten"
        );
        Ok(removed_books.len())
    }
}
