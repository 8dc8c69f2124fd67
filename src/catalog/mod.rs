//! Catalog records and the read-only catalog index.
//!
//! The catalog is consumed strictly read-only: it is loaded once per run from
//! a CSV snapshot, turned into a [`CatalogIndex`] (ISBN lookup map plus
//! frequency-filtered author/publisher token sets), and shared immutably with
//! the field guesser and the entity matcher.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Tokens must occur at least this often across the catalog to enter an
/// index token set.
pub const TOKEN_MIN_FREQUENCY: usize = 2;

/// Tokens above this catalog-wide frequency are treated as stop-tokens and
/// excluded from the index token sets.
pub const TOKEN_MAX_FREQUENCY: usize = 500;

/// Catalog loading error types
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// One catalog record as read from the snapshot CSV.
///
/// All fields are plain strings with empty-string defaults. Missing columns
/// never become absent keys; the matcher's "treat missing as empty" contract
/// is carried by the type itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub year: String,
}

/// Lowercase a string and strip everything but letters, digits and
/// whitespace, collapsing runs of whitespace to single spaces.
pub fn clean_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_space = true;
    for ch in s.chars() {
        if ch.is_alphanumeric() {
            for lc in ch.to_lowercase() {
                out.push(lc);
            }
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Split a string into normalized tokens (see [`clean_text`]).
pub fn tokenize(s: &str) -> Vec<String> {
    clean_text(s)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Strip an ISBN down to its significant characters (digits plus `X`/`x`).
pub fn normalize_isbn(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
        .collect()
}

/// Does any token of `text` appear in `token_set`?
pub fn has_any_token(text: &str, token_set: &HashSet<String>) -> bool {
    tokenize(text).iter().any(|t| token_set.contains(t))
}

/// Process-lifetime, read-only index over a catalog snapshot.
///
/// Built once; never mutated afterwards. Owns the snapshot so the ISBN and
/// id maps can hand out `&CatalogEntry` without lifetimes leaking into
/// callers.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    entries: Vec<CatalogEntry>,
    by_isbn: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
    author_tokens: HashSet<String>,
    publisher_tokens: HashSet<String>,
}

impl CatalogIndex {
    /// Build the index from a fully-materialized catalog snapshot.
    pub fn build(entries: Vec<CatalogEntry>) -> Self {
        let mut by_isbn = HashMap::new();
        let mut by_id = HashMap::new();
        let mut author_counts: HashMap<String, usize> = HashMap::new();
        let mut publisher_counts: HashMap<String, usize> = HashMap::new();

        for (i, entry) in entries.iter().enumerate() {
            let isbn = normalize_isbn(&entry.isbn);
            if !isbn.is_empty() {
                by_isbn.entry(isbn).or_insert(i);
            }
            if !entry.id.is_empty() {
                by_id.entry(entry.id.clone()).or_insert(i);
            }
            for t in tokenize(&entry.author) {
                *author_counts.entry(t).or_insert(0) += 1;
            }
            for t in tokenize(&entry.publisher) {
                *publisher_counts.entry(t).or_insert(0) += 1;
            }
        }

        Self {
            entries,
            by_isbn,
            by_id,
            author_tokens: filter_token_counts(author_counts),
            publisher_tokens: filter_token_counts(publisher_counts),
        }
    }

    /// The full enumerable snapshot, for linear similarity scans.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Look up an entry by normalized ISBN.
    pub fn by_isbn(&self, isbn: &str) -> Option<&CatalogEntry> {
        self.by_isbn
            .get(&normalize_isbn(isbn))
            .map(|&i| &self.entries[i])
    }

    /// Look up an entry by catalog id.
    pub fn by_id(&self, id: &str) -> Option<&CatalogEntry> {
        self.by_id.get(id).map(|&i| &self.entries[i])
    }

    /// Frequency-filtered author token set.
    pub fn author_tokens(&self) -> &HashSet<String> {
        &self.author_tokens
    }

    /// Frequency-filtered publisher token set.
    pub fn publisher_tokens(&self) -> &HashSet<String> {
        &self.publisher_tokens
    }
}

/// Keep medium-frequency tokens longer than one character. Rare tokens are
/// OCR noise, ubiquitous tokens behave like stop-words.
fn filter_token_counts(counts: HashMap<String, usize>) -> HashSet<String> {
    counts
        .into_iter()
        .filter(|(token, count)| {
            (TOKEN_MIN_FREQUENCY..=TOKEN_MAX_FREQUENCY).contains(count) && token.chars().count() > 1
        })
        .map(|(token, _)| token)
        .collect()
}

/// Load a catalog snapshot from a CSV file with headers
/// `id,title,author,publisher,isbn,year`.
pub fn load_catalog_csv(path: &Path) -> Result<Vec<CatalogEntry>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut out = Vec::new();
    for record in reader.deserialize() {
        let entry: CatalogEntry = record?;
        out.push(entry);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, title: &str, author: &str, publisher: &str, isbn: &str) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            publisher: publisher.to_string(),
            isbn: isbn.to_string(),
            year: String::new(),
        }
    }

    #[test]
    fn test_clean_text_strips_punctuation() {
        assert_eq!(clean_text("Die  Blechtrommel: Roman!"), "die blechtrommel roman");
        assert_eq!(clean_text("Hermann Hesse"), "hermann hesse");
        assert_eq!(clean_text("  "), "");
    }

    #[test]
    fn test_clean_text_keeps_umlauts() {
        assert_eq!(clean_text("Die Bücher-Diebin"), "die bücher diebin");
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Günter Grass, dtv"), vec!["günter", "grass", "dtv"]);
        assert!(tokenize("???").is_empty());
    }

    #[test]
    fn test_normalize_isbn() {
        assert_eq!(normalize_isbn("978-3-16-148410-0"), "9783161484100");
        assert_eq!(normalize_isbn("0-8044-2957-X"), "080442957X");
    }

    #[test]
    fn test_index_isbn_lookup() {
        let entries = vec![entry("7", "Die Blechtrommel", "Günter Grass", "dtv", "9783423135702")];
        let index = CatalogIndex::build(entries);
        assert!(index.by_isbn("978-3-423-13570-2").is_some());
        assert!(index.by_isbn("9780000000000").is_none());
        assert_eq!(index.by_id("7").map(|e| e.title.as_str()), Some("Die Blechtrommel"));
    }

    #[test]
    fn test_token_frequency_filter() {
        // "grass" appears twice (kept), "lenz" once (dropped), single letters dropped
        let entries = vec![
            entry("1", "A", "Günter Grass", "", ""),
            entry("2", "B", "Grass, G", "", ""),
            entry("3", "C", "Siegfried Lenz", "", ""),
        ];
        let index = CatalogIndex::build(entries);
        assert!(index.author_tokens().contains("grass"));
        assert!(!index.author_tokens().contains("lenz"));
        assert!(!index.author_tokens().contains("g"));
    }

    #[test]
    fn test_has_any_token() {
        let set: HashSet<String> = ["grass".to_string()].into_iter().collect();
        assert!(has_any_token("von Günter GRASS", &set));
        assert!(!has_any_token("Thomas Mann", &set));
    }

    #[test]
    fn test_index_empty_catalog() {
        let index = CatalogIndex::build(Vec::new());
        assert!(index.entries().is_empty());
        assert!(index.author_tokens().is_empty());
    }
}
