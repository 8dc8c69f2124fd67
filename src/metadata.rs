//! Metadata enrichment seam.
//!
//! Matched-as-new books can be enriched from external catalog services.
//! The pipeline itself stays offline; it only talks to the
//! [`MetadataProvider`] trait, and a chain of providers is tried in order
//! until one answers.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// How many cleaned words a search query keeps.
const QUERY_MAX_WORDS: usize = 5;

/// Metadata lookup error types
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Provider request failed: {0}")]
    Request(String),

    #[error("Provider response malformed: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, MetadataError>;

/// Metadata for one book as returned by a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookMetadata {
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

/// One external metadata source.
pub trait MetadataProvider {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Look up metadata for a free-text query. `Ok(None)` means the
    /// provider answered but found nothing.
    fn lookup(&self, query: &str) -> Result<Option<BookMetadata>>;
}

/// Providers tried in order; errors fall through to the next provider.
#[derive(Default)]
pub struct ProviderChain {
    providers: Vec<Box<dyn MetadataProvider>>,
}

impl ProviderChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, provider: Box<dyn MetadataProvider>) {
        self.providers.push(provider);
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// First successful non-empty answer wins. A provider error is logged
    /// and the chain moves on; only "every provider came up empty" is
    /// `Ok(None)`.
    pub fn lookup(&self, query: &str) -> Result<Option<BookMetadata>> {
        if query.trim().is_empty() {
            return Ok(None);
        }
        for provider in &self.providers {
            match provider.lookup(query) {
                Ok(Some(metadata)) => {
                    debug!(provider = provider.name(), "metadata hit");
                    return Ok(Some(metadata));
                }
                Ok(None) => {
                    debug!(provider = provider.name(), "metadata miss");
                }
                Err(e) => {
                    warn!(provider = provider.name(), "metadata lookup failed: {e}");
                }
            }
        }
        Ok(None)
    }
}

/// Distill OCR text into a search query: alphabetic words of three or more
/// letters, deduplicated, longest words first, capped at five.
pub fn search_query(text: &str) -> String {
    let mut seen = std::collections::HashSet::new();
    let mut words: Vec<String> = text
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphabetic())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| w.chars().count() >= 3)
        .filter(|w| seen.insert(w.clone()))
        .collect();
    // stable sort keeps reading order among equal lengths
    words.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));
    words.truncate(QUERY_MAX_WORDS);
    words.join(" ")
}
