//! Entity matcher: decides whether a spine segment corresponds to an
//! already-cataloged book or to a new item.
//!
//! # Decision order
//!
//! 1. A checksum-valid ISBN found in the text and present in the catalog
//!    index wins unconditionally (score 1.0, reason `isbn`).
//! 2. A baseline candidate from an earlier coarse pass is accepted when its
//!    externally-supplied score reaches the acceptance threshold.
//! 3. A lower-scoring baseline candidate is surfaced as a provisional
//!    suggestion; the segment stays undecided.
//! 4. A linear scan over the catalog scores every title by sequence
//!    similarity and token Jaccard, with small author/publisher token
//!    bonuses.
//!
//! The linear scan is O(segments x catalog size) and is the dominant cost
//! after OCR; acceptable for catalogs in the low thousands.

mod isbn;
mod similarity;

pub use isbn::{find_isbn, is_valid_isbn10, is_valid_isbn13};
pub use similarity::{jaccard, sequence_ratio};

use crate::catalog::{clean_text, has_any_token, tokenize, CatalogEntry, CatalogIndex};

/// Acceptance thresholds and score bonuses.
///
/// The defaults were tuned by hand on one library's catalog and are not
/// known to be optimal; they are deliberately configurable.
#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Baseline candidates at or above this score are accepted directly.
    pub baseline_accept: f64,
    /// Similarity acceptance threshold when an author token is present.
    pub author_title_accept: f64,
    /// Similarity acceptance threshold on title evidence alone.
    pub title_only_accept: f64,
    /// Score bonus when the text shares a token with the entry's author.
    pub author_bonus: f64,
    /// Score bonus when the text shares a token with the entry's publisher.
    pub publisher_bonus: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            baseline_accept: 0.84,
            author_title_accept: 0.75,
            title_only_accept: 0.88,
            author_bonus: 0.05,
            publisher_bonus: 0.03,
        }
    }
}

/// A coarse match from an earlier pass, treated as a prior to be confirmed
/// or overridden.
#[derive(Debug, Clone)]
pub struct BaselineCandidate {
    pub book_id: String,
    pub score: f64,
}

/// Terminal classification of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Existing,
    New,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Existing => "existing",
            MatchStatus::New => "new",
        }
    }
}

/// Which rule produced the outcome. `Existing` outcomes always carry one of
/// the first four reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    Isbn,
    BaselineAccepted,
    AuthorTitle,
    TitleOnly,
    BaselineSuggestion,
    None,
}

impl MatchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchReason::Isbn => "isbn",
            MatchReason::BaselineAccepted => "baseline>=0.84",
            MatchReason::AuthorTitle => "author+title",
            MatchReason::TitleOnly => "title-only>=0.88",
            MatchReason::BaselineSuggestion => "baseline-suggestion",
            MatchReason::None => "",
        }
    }
}

/// Result of matching one segment against the catalog. Terminal; produced
/// exactly once per segment.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// Matched catalog id; empty unless matched or a suggestion was carried
    /// forward from a baseline candidate.
    pub matched_id: String,
    pub matched_title: String,
    pub matched_author: String,
    pub matched_publisher: String,
    /// Final score in [0, 1].
    pub score: f64,
    pub status: MatchStatus,
    pub reason: MatchReason,
}

impl MatchOutcome {
    fn new_unmatched(score: f64) -> Self {
        Self {
            matched_id: String::new(),
            matched_title: String::new(),
            matched_author: String::new(),
            matched_publisher: String::new(),
            score,
            status: MatchStatus::New,
            reason: MatchReason::None,
        }
    }

    fn take_entry(&mut self, entry: &CatalogEntry) {
        self.matched_id = entry.id.clone();
        self.matched_title = entry.title.clone();
        self.matched_author = entry.author.clone();
        self.matched_publisher = entry.publisher.clone();
    }
}

/// Blended title similarity: sequence ratio over cleaned text plus token
/// Jaccard. Zero when either side cleans to nothing.
pub fn score_title(text: &str, title: &str) -> f64 {
    let a = clean_text(text);
    let b = clean_text(title);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let s1 = sequence_ratio(&a, &b);
    let s2 = jaccard(&tokenize(&a), &tokenize(&b));
    0.6 * s1 + 0.4 * s2
}

/// Classify one segment's text against the catalog.
///
/// Pure function of its inputs; performs no writes. Missing catalog fields
/// are empty strings and score as such.
pub fn match_segment(
    text: &str,
    baseline: Option<&BaselineCandidate>,
    index: &CatalogIndex,
    options: &MatchOptions,
) -> MatchOutcome {
    let baseline_score = baseline.map(|b| b.score).unwrap_or(0.0);
    let mut outcome = MatchOutcome::new_unmatched(baseline_score);

    // 1) a valid cataloged ISBN beats everything
    if let Some(isbn) = find_isbn(text) {
        if let Some(entry) = index.by_isbn(&isbn) {
            outcome.take_entry(entry);
            outcome.score = 1.0;
            outcome.status = MatchStatus::Existing;
            outcome.reason = MatchReason::Isbn;
            return outcome;
        }
    }

    // 2) high-confidence baseline carry-over
    if let Some(candidate) = baseline {
        if let Some(entry) = index.by_id(&candidate.book_id) {
            if candidate.score >= options.baseline_accept {
                outcome.take_entry(entry);
                outcome.status = MatchStatus::Existing;
                outcome.reason = MatchReason::BaselineAccepted;
                return outcome;
            }
            // 3) surface a lower-scoring baseline as a provisional suggestion
            outcome.take_entry(entry);
            outcome.reason = MatchReason::BaselineSuggestion;
        }
    }

    // 4) token-overlap title similarity over the whole catalog
    let has_author = has_any_token(text, index.author_tokens());
    let has_publisher = has_any_token(text, index.publisher_tokens());
    let text_tokens = tokenize(text);

    let mut best: Option<&CatalogEntry> = None;
    let mut best_score = 0.0;
    for entry in index.entries() {
        let mut s = score_title(text, &entry.title);
        if has_author
            && !entry.author.is_empty()
            && tokenize(&entry.author).iter().any(|t| text_tokens.contains(t))
        {
            s += options.author_bonus;
        }
        if has_publisher
            && !entry.publisher.is_empty()
            && tokenize(&entry.publisher).iter().any(|t| text_tokens.contains(t))
        {
            s += options.publisher_bonus;
        }
        if s > best_score {
            best_score = s;
            best = Some(entry);
        }
    }

    if let Some(entry) = best {
        let author_rule = has_author && best_score >= options.author_title_accept;
        if author_rule || best_score >= options.title_only_accept {
            outcome.take_entry(entry);
            outcome.score = outcome.score.max(best_score);
            outcome.status = MatchStatus::Existing;
            outcome.reason = if author_rule {
                MatchReason::AuthorTitle
            } else {
                MatchReason::TitleOnly
            };
        }
    }

    outcome
}
