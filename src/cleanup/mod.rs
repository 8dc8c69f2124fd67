//! Catalog hygiene: deletion and quarantine of gibberish records.
//!
//! Two passes with different risk profiles:
//!
//! - **Delete** ([`delete`]) - irreversibly drop records where every field
//!   agrees the entry is OCR garbage
//! - **Quarantine** ([`quarantine`]) - move suspect records into a
//!   timestamped audit CSV (plus spine images) before removal
//!
//! Both passes honor copy protection: copies imported from trusted sources
//! or already verified online are never touched.

pub mod delete;
pub mod quarantine;
mod store;
pub mod types;

pub use delete::{plan_deletions, preview_lines, should_delete, DeletePlan, PREVIEW_LIMIT};
pub use quarantine::{
    plan_quarantine, quarantine_reason, write_audit_csv, QuarantineCandidate, QuarantineOptions,
    QuarantineReason,
};
pub use store::CsvCatalogStore;
pub use types::{load_export_csv, BookRecord, CleanupError, CopyRecord, Result};

/// Earliest year a printed book can plausibly carry.
pub const MIN_PLAUSIBLE_YEAR: i32 = 1450;

/// Copy status assigned by the trusted bulk importer.
pub const PROTECTED_IMPORT_STATUS: &str = "Gemini-Import";

/// Is this year a believable publication year as of `current_year`?
pub fn plausible_year(year: Option<i32>, current_year: i32) -> bool {
    match year {
        Some(y) => (MIN_PLAUSIBLE_YEAR..=current_year + 1).contains(&y),
        None => false,
    }
}

/// A copy is protected when it came from the trusted importer or its
/// status says it was verified online.
pub fn is_protected_status(status: &str) -> bool {
    if status == PROTECTED_IMPORT_STATUS {
        return true;
    }
    let lower = status.to_lowercase();
    if let Some(pos) = lower.find("online") {
        return lower[pos..].contains("verifiz");
    }
    false
}

/// Does any copy of this book carry a protected status?
pub fn has_protected_copy(book: &BookRecord) -> bool {
    book.copies
        .iter()
        .any(|c| is_protected_status(&c.digitization_status))
}

/// Is any ISBN recorded at all? Presence counts as structured metadata
/// even when the check digit is wrong.
pub fn has_isbn(book: &BookRecord) -> bool {
    !book.isbn10.trim().is_empty() || !book.isbn13.trim().is_empty()
}

/// Abstraction over the catalog's persistent form, so the removal passes
/// can be tested without touching files.
pub trait CatalogStore {
    /// Remove the given book ids. Returns how many records were removed.
    fn delete_books(&mut self, ids: &[String]) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plausible_year_bounds() {
        assert!(plausible_year(Some(1450), 2026));
        assert!(plausible_year(Some(2027), 2026));
        assert!(!plausible_year(Some(1449), 2026));
        assert!(!plausible_year(Some(2028), 2026));
        assert!(!plausible_year(None, 2026));
    }

    #[test]
    fn test_protected_statuses() {
        assert!(is_protected_status("Gemini-Import"));
        assert!(is_protected_status("Online verifiziert"));
        assert!(is_protected_status("online-verifiziert 2024"));
        assert!(!is_protected_status("Foto erfasst"));
        assert!(!is_protected_status("online"));
        assert!(!is_protected_status(""));
    }
}
