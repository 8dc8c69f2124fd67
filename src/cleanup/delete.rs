//! Conservative deletion pass for gibberish catalog records.
//!
//! A book is flagged only when every independent signal says it is OCR
//! garbage: gibberish title, no usable author, no publisher, no ISBN on
//! file, no plausible year, and no protected copy. One real-looking field
//! keeps the record.

use tracing::info;

use crate::gibberish::{gibberish_score, GibberishOptions, BLANK_SCORE, GIBBERISH_CUTOFF};

use super::types::BookRecord;
use super::{has_isbn, has_protected_copy, plausible_year};

/// Maximum flagged books echoed in the preview listing.
pub const PREVIEW_LIMIT: usize = 25;

/// Outcome of the deletion scan.
#[derive(Debug, Default)]
pub struct DeletePlan {
    pub flagged_ids: Vec<String>,
    pub scanned: usize,
    pub protected: usize,
}

fn text_unusable(text: &str, options: &GibberishOptions) -> bool {
    let value = text.trim();
    if value.is_empty() {
        return BLANK_SCORE >= GIBBERISH_CUTOFF;
    }
    gibberish_score(Some(value), options) >= GIBBERISH_CUTOFF
}

/// Should this record be deleted under the conservative rule?
pub fn should_delete(book: &BookRecord, current_year: i32, options: &GibberishOptions) -> bool {
    if gibberish_score(Some(book.title.trim()), options) < GIBBERISH_CUTOFF {
        return false;
    }
    if !text_unusable(&book.author, options) {
        return false;
    }
    // a publisher of any kind is taken as provenance
    if !book.publisher.trim().is_empty() {
        return false;
    }
    // any ISBN on file protects, even one with a bad check digit
    if has_isbn(book) {
        return false;
    }
    if plausible_year(book.year, current_year) {
        return false;
    }
    !has_protected_copy(book)
}

/// Scan all books and collect the deletion plan. Nothing is removed here;
/// the caller applies the plan through a store.
pub fn plan_deletions(
    books: &[BookRecord],
    current_year: i32,
    options: &GibberishOptions,
) -> DeletePlan {
    let mut plan = DeletePlan {
        scanned: books.len(),
        ..Default::default()
    };
    for book in books {
        if has_protected_copy(book) {
            plan.protected += 1;
            continue;
        }
        if should_delete(book, current_year, options) {
            plan.flagged_ids.push(book.id.clone());
        }
    }
    info!(
        scanned = plan.scanned,
        flagged = plan.flagged_ids.len(),
        protected = plan.protected,
        "deletion scan complete"
    );
    plan
}

/// Human-readable preview lines for the first flagged books.
pub fn preview_lines(books: &[BookRecord], plan: &DeletePlan) -> Vec<String> {
    plan.flagged_ids
        .iter()
        .take(PREVIEW_LIMIT)
        .filter_map(|id| books.iter().find(|b| &b.id == id))
        .map(|b| format!("  [{}] '{}' / '{}'", b.id, b.title, b.author))
        .collect()
}
