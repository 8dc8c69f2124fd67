//! Field guessing: split raw spine text into probable title, author and
//! publisher using token vocabularies built from the catalog.
//!
//! This is a cheap lexical pass, not a parser. Author and publisher guesses
//! come from intersecting the text's tokens with catalog vocabularies; the
//! title guess is the longest line left over once those tokens and obvious
//! series markers are removed.

use std::collections::HashSet;

use crate::catalog::{clean_text, tokenize, CatalogIndex};

/// Tokens that mark a line as series or edition noise, never a title.
const STOP_LINE_TOKENS: [&str; 4] = ["band", "reihe", "bd", "auflage"];

/// Maximum tokens kept in an author guess.
const MAX_AUTHOR_TOKENS: usize = 4;

/// Maximum tokens kept in a publisher guess.
const MAX_PUBLISHER_TOKENS: usize = 3;

/// One guessed field with a rough confidence in `[0, 1]`.
#[derive(Debug, Clone, Default)]
pub struct FieldGuess {
    pub value: String,
    pub confidence: f64,
}

impl FieldGuess {
    fn from_matches(mut matched: Vec<String>, distinct_tokens: usize, cap: usize) -> Self {
        if matched.is_empty() {
            return Self::default();
        }
        // confidence reflects the full intersection, even beyond the cap
        let confidence = (matched.len() as f64 / distinct_tokens.max(3) as f64).min(1.0);
        matched.truncate(cap);
        Self {
            value: matched.join(" "),
            confidence,
        }
    }
}

/// All three guesses for one segment.
#[derive(Debug, Clone, Default)]
pub struct FieldGuesses {
    pub title: FieldGuess,
    pub author: FieldGuess,
    pub publisher: FieldGuess,
}

fn vocabulary_matches(text: &str, vocabulary: &HashSet<String>) -> (Vec<String>, usize) {
    let tokens = tokenize(&clean_text(text));
    let mut seen = HashSet::new();
    let mut matched = Vec::new();
    for token in &tokens {
        if seen.insert(token.clone()) && vocabulary.contains(token) {
            matched.push(token.clone());
        }
    }
    (matched, seen.len())
}

/// Guess the author as catalog author-vocabulary tokens present in the text.
pub fn guess_author(text: &str, catalog: &CatalogIndex) -> FieldGuess {
    let (matched, distinct) = vocabulary_matches(text, catalog.author_tokens());
    FieldGuess::from_matches(matched, distinct, MAX_AUTHOR_TOKENS)
}

/// Guess the publisher from the catalog publisher vocabulary.
pub fn guess_publisher(text: &str, catalog: &CatalogIndex) -> FieldGuess {
    let (matched, distinct) = vocabulary_matches(text, catalog.publisher_tokens());
    FieldGuess::from_matches(matched, distinct, MAX_PUBLISHER_TOKENS)
}

/// Guess the title as the longest surviving line after dropping lines that
/// are mostly author/publisher tokens, series markers, or too short to be
/// a title. Falls back to the longest raw line.
pub fn guess_title(text: &str, author: &FieldGuess, publisher: &FieldGuess) -> FieldGuess {
    let claimed: HashSet<String> = tokenize(&clean_text(&author.value))
        .into_iter()
        .chain(tokenize(&clean_text(&publisher.value)))
        .collect();

    let mut best: Option<&str> = None;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let tokens = tokenize(&clean_text(line));
        if tokens.iter().any(|t| STOP_LINE_TOKENS.contains(&t.as_str())) {
            continue;
        }
        if !claimed.is_empty() && tokens.iter().any(|t| claimed.contains(t)) {
            continue;
        }
        let alpha = line.chars().filter(|c| c.is_alphabetic()).count();
        if alpha < 4 {
            continue;
        }
        // strictly greater keeps the earliest line on ties
        if best.map_or(true, |b| line.chars().count() > b.chars().count()) {
            best = Some(line);
        }
    }

    if let Some(line) = best {
        let confidence = if claimed.is_empty() { 0.4 } else { 0.6 };
        return FieldGuess {
            value: line.to_string(),
            confidence,
        };
    }

    // every line was claimed or too short, keep the longest raw line
    let fallback = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .fold(None::<&str>, |acc, line| match acc {
            Some(b) if b.chars().count() >= line.chars().count() => Some(b),
            _ => Some(line),
        });
    FieldGuess {
        value: fallback.unwrap_or("").to_string(),
        confidence: 0.2,
    }
}

/// Run all three guessers over one segment's text.
pub fn guess_fields(text: &str, catalog: &CatalogIndex) -> FieldGuesses {
    let author = guess_author(text, catalog);
    let publisher = guess_publisher(text, catalog);
    let title = guess_title(text, &author, &publisher);
    FieldGuesses {
        title,
        author,
        publisher,
    }
}
