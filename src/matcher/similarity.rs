//! Text similarity primitives used by the entity matcher.
//!
//! `sequence_ratio` is a character-level longest-matching-blocks ratio
//! (Ratcliff-Obershelp): twice the total length of all matching blocks
//! divided by the combined length of both inputs.

use std::collections::HashMap;

/// Character-level longest-matching-blocks similarity in `[0, 1]`.
///
/// Two empty strings are identical by convention (ratio 1.0).
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let length = a.len() + b.len();
    if length == 0 {
        return 1.0;
    }

    // positions of each character in b, ascending
    let mut b_positions: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, &ch) in b.iter().enumerate() {
        b_positions.entry(ch).or_default().push(j);
    }

    let mut matches = 0usize;
    let mut queue: Vec<(usize, usize, usize, usize)> = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(&a, &b_positions, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matches += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }

    2.0 * matches as f64 / length as f64
}

/// Longest matching block of `a[alo..ahi]` against `b[blo..bhi]`,
/// returned as (start in a, start in b, length). Ties prefer the earliest
/// start in `a`, then in `b`.
fn longest_match(
    a: &[char],
    b_positions: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0usize);
    let mut run_lengths: HashMap<usize, usize> = HashMap::new();

    for (i, &ch) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut new_runs: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b_positions.get(&ch) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = if j == 0 {
                    1
                } else {
                    run_lengths.get(&(j - 1)).copied().unwrap_or(0) + 1
                };
                new_runs.insert(j, k);
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            }
        }
        run_lengths = new_runs;
    }

    best
}

/// Token-set Jaccard similarity: |intersection| / |union|, 0 when either
/// side is empty.
pub fn jaccard(a: &[String], b: &[String]) -> f64 {
    use std::collections::HashSet;
    let sa: HashSet<&str> = a.iter().map(String::as_str).collect();
    let sb: HashSet<&str> = b.iter().map(String::as_str).collect();
    if sa.is_empty() || sb.is_empty() {
        return 0.0;
    }
    let intersection = sa.intersection(&sb).count();
    let union = sa.union(&sb).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_identical_strings() {
        assert!((sequence_ratio("blechtrommel", "blechtrommel") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_strings() {
        assert!((sequence_ratio("", "") - 1.0).abs() < 1e-12);
        assert_eq!(sequence_ratio("abc", ""), 0.0);
    }

    #[test]
    fn test_disjoint_strings() {
        assert_eq!(sequence_ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_known_ratio() {
        // difflib reference: SequenceMatcher(None, "abcd", "bcde").ratio() == 0.75
        assert!((sequence_ratio("abcd", "bcde") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_substring_ratio() {
        // "die blechtrommel" (16) vs "die blechtrommel roman" (22): 16 matched chars
        let r = sequence_ratio("die blechtrommel", "die blechtrommel roman");
        assert!((r - 2.0 * 16.0 / 38.0).abs() < 1e-12);
    }

    #[test]
    fn test_symmetry_of_matched_total() {
        let a = "hermann hesse der steppenwolf";
        let b = "der steppenwolf";
        let r1 = sequence_ratio(a, b);
        let r2 = sequence_ratio(b, a);
        assert!((r1 - r2).abs() < 1e-12);
    }

    #[test]
    fn test_jaccard() {
        assert_eq!(jaccard(&toks(&["die", "blechtrommel"]), &toks(&["die", "blechtrommel"])), 1.0);
        assert_eq!(jaccard(&toks(&["a", "b"]), &toks(&["b", "c"])), 1.0 / 3.0);
        assert_eq!(jaccard(&[], &toks(&["a"])), 0.0);
    }

    #[test]
    fn test_jaccard_duplicates_collapse() {
        assert_eq!(jaccard(&toks(&["a", "a", "b"]), &toks(&["a", "b"])), 1.0);
    }
}
