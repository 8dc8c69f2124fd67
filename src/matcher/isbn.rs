//! ISBN extraction and checksum validation.

use crate::catalog::normalize_isbn;
use regex::Regex;
use std::sync::OnceLock;

/// ISBN-shaped substrings: 13 digits with optional 978/979 prefix and
/// separators, or 10 characters with an optional trailing X.
fn isbn_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:97[89][- ]?(?:\d[- ]?){9}\d|\b\d{9}[\dXx]\b)")
            .unwrap_or_else(|e| panic!("invalid ISBN pattern: {e}"))
    })
}

/// Validate an ISBN-10 checksum. Separators are stripped first.
///
/// Sum of digit x position over positions 1..=9, plus the check digit
/// (value 10 for `X`) times 10, must be divisible by 11.
pub fn is_valid_isbn10(s: &str) -> bool {
    let s = normalize_isbn(s);
    let chars: Vec<char> = s.chars().collect();
    if chars.len() != 10 {
        return false;
    }
    let mut total: u32 = 0;
    for (i, ch) in chars.iter().take(9).enumerate() {
        match ch.to_digit(10) {
            Some(d) => total += (i as u32 + 1) * d,
            None => return false,
        }
    }
    let check = chars[9];
    if check == 'x' || check == 'X' {
        total += 10 * 10;
    } else if let Some(d) = check.to_digit(10) {
        total += 10 * d;
    } else {
        return false;
    }
    total % 11 == 0
}

/// Validate an ISBN-13 checksum. Separators are stripped first.
///
/// Weights alternate 1,3 over the first 12 digits; the check digit must be
/// `(10 - sum mod 10) mod 10`.
pub fn is_valid_isbn13(s: &str) -> bool {
    let s: String = s.chars().filter(char::is_ascii_digit).collect();
    let digits: Vec<u32> = s.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 13 {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .take(12)
        .enumerate()
        .map(|(i, d)| d * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    (10 - sum % 10) % 10 == digits[12]
}

/// Scan free text for the first checksum-valid ISBN, returned in normalized
/// (separator-free) form.
pub fn find_isbn(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    for m in isbn_pattern().find_iter(text) {
        let flat = normalize_isbn(m.as_str());
        if is_valid_isbn13(&flat) || is_valid_isbn10(&flat) {
            return Some(flat);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isbn13_valid() {
        assert!(is_valid_isbn13("978-3-16-148410-0"));
        assert!(is_valid_isbn13("9783423135702"));
    }

    #[test]
    fn test_isbn13_invalid() {
        assert!(!is_valid_isbn13("978-3-16-148410-1"));
        assert!(!is_valid_isbn13("12345"));
    }

    #[test]
    fn test_isbn10_valid() {
        assert!(is_valid_isbn10("080442957X"));
        assert!(is_valid_isbn10("3-423-13570-0"));
    }

    #[test]
    fn test_isbn10_invalid_checksum() {
        assert!(!is_valid_isbn10("1234567890"));
        assert!(!is_valid_isbn10("080442957A"));
    }

    #[test]
    fn test_find_isbn_with_separators() {
        let text = "Roman dtv ISBN 978-3-423-13570-2 Taschenbuch";
        assert_eq!(find_isbn(text), Some("9783423135702".to_string()));
    }

    #[test]
    fn test_find_isbn_bare_ten() {
        assert_eq!(find_isbn("vgl 080442957X hinten"), Some("080442957X".to_string()));
    }

    #[test]
    fn test_find_isbn_skips_invalid() {
        // checksum-invalid candidate must not be returned
        assert_eq!(find_isbn("Nummer 1234567890 ohne Sinn"), None);
        assert_eq!(find_isbn(""), None);
        assert_eq!(find_isbn("kein ISBN hier"), None);
    }
}
