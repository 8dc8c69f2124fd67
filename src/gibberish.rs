//! Heuristic OCR-garbage ("gibberish") classifier for short text fields.
//!
//! A score counts independently triggered heuristics; a text with score >= 2
//! is treated as unreliable. The classifier feeds both the entity matcher's
//! confidence handling and the catalog cleanup/quarantine policies.

/// Score assigned to missing or all-whitespace input. Absent data is
/// gibberish by definition, never "clean by absence".
pub const BLANK_SCORE: u32 = 3;

/// Score at or above which a text is classified as gibberish.
pub const GIBBERISH_CUTOFF: u32 = 2;

/// Vowels for the classifier, `y` included (unlike the OCR quality score).
const VOWELS: &str = "aeiouyäöü";

/// Punctuation that is considered ordinary in titles and names.
const COMMON_PUNCTUATION: &str = ",.'-()!?";

/// Tuning knobs for [`gibberish_score`].
#[derive(Debug, Clone)]
pub struct GibberishOptions {
    /// Fraction of special characters above which the special-character
    /// heuristic fires. The cleanup policy uses 0.20, quarantine 0.22.
    pub special_fraction: f64,
    /// Enable the one-letter-token heuristic (quarantine variant only).
    pub count_single_letter_tokens: bool,
}

impl Default for GibberishOptions {
    fn default() -> Self {
        Self {
            special_fraction: 0.20,
            count_single_letter_tokens: false,
        }
    }
}

impl GibberishOptions {
    /// Options used by the quarantine policy: slightly laxer special-character
    /// fraction plus the one-letter-token rule.
    pub fn quarantine() -> Self {
        Self {
            special_fraction: 0.22,
            count_single_letter_tokens: true,
        }
    }
}

fn is_vowel(ch: char) -> bool {
    ch.to_lowercase().any(|c| VOWELS.contains(c))
}

fn is_special(ch: char) -> bool {
    !(ch.is_alphabetic()
        || ch.is_ascii_digit()
        || ch.is_whitespace()
        || COMMON_PUNCTUATION.contains(ch))
}

/// Count independently triggered garbage heuristics on a text field.
///
/// `None` and blank inputs score [`BLANK_SCORE`].
pub fn gibberish_score(text: Option<&str>, options: &GibberishOptions) -> u32 {
    let s = match text {
        Some(t) => t.trim(),
        None => return BLANK_SCORE,
    };
    if s.is_empty() {
        return BLANK_SCORE;
    }

    let total = s.chars().count();
    let vowels = s.chars().filter(|c| is_vowel(*c)).count();
    let letters = s.chars().filter(|c| c.is_alphabetic()).count();
    let specials = s.chars().filter(|c| is_special(*c)).count();

    let mut score = 0;

    // 1) too few vowels for the length
    if total >= 12 && vowels <= 1 {
        score += 1;
    }

    // 2) high fraction of special characters
    if specials as f64 / total as f64 > options.special_fraction {
        score += 1;
    }

    // 3) long vowel-free tokens
    let tokens: Vec<&str> = s.split_whitespace().collect();
    if tokens
        .iter()
        .any(|t| t.chars().count() >= 12 && !t.chars().any(is_vowel))
    {
        score += 1;
    }

    // 4) backslash artifacts from broken encodings
    if s.chars().filter(|c| *c == '\\').count() >= 3 {
        score += 1;
    }

    // 5) hardly any letters at all
    if (letters as f64 / total as f64) < 0.35 {
        score += 1;
    }

    // 6) mostly one-letter tokens (quarantine variant)
    if options.count_single_letter_tokens && !tokens.is_empty() {
        let singles = tokens.iter().filter(|t| t.chars().count() == 1).count();
        if singles as f64 / tokens.len() as f64 >= 0.5 {
            score += 1;
        }
    }

    score
}

/// Classify a text field as OCR garbage.
pub fn looks_gibberish(text: Option<&str>, options: &GibberishOptions) -> bool {
    gibberish_score(text, options) >= GIBBERISH_CUTOFF
}
