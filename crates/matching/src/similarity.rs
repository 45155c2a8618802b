use std::collections::HashSet;

use crate::normalize::normalize_text;
use crate::util::levenshtein_distance;

/// Inputs shorter than this only score on an exact match.
const MIN_FUZZY_LEN: usize = 3;

const CONTAINMENT_BASE: f64 = 0.5;
const CONTAINMENT_SPAN: f64 = 0.4;

/// One-letter Hebrew prefixes that may be glued to a contained word.
const HEBREW_PREFIXES: &[char] = &['ו', 'ה', 'ב', 'כ', 'ל', 'מ', 'ש'];

/// Minimum fraction of shared tokens before token overlap is trusted.
const MIN_TOKEN_OVERLAP: f64 = 0.5;
const TOKEN_BASE: f64 = 0.5;
const TOKEN_SPAN: f64 = 0.4;

/// Normalizes both inputs and scores them.
///
/// | signal        | score                          |
/// |---------------|--------------------------------|
/// | exact         | `1.0`                          |
/// | containment   | `(0.5, 0.9)` by length ratio   |
/// | token overlap | `[0.7, 0.9]` by shared tokens  |
/// | edit distance | `[0.0, 1.0)`                   |
pub fn calculate_similarity(a: &str, b: &str) -> f64 {
    normalized_similarity(&normalize_text(a), &normalize_text(b))
}

/// Scores two strings that are already in normalized form.
///
/// The matcher normalizes each catalog pattern and each candidate once and
/// calls this in its inner loop.
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.chars().count() < MIN_FUZZY_LEN || b.chars().count() < MIN_FUZZY_LEN {
        return 0.0;
    }

    if let Some(score) = containment_score(a, b) {
        return score;
    }
    if let Some(score) = token_overlap_score(a, b) {
        return score;
    }
    edit_distance_score(a, b)
}

fn containment_score(a: &str, b: &str) -> Option<f64> {
    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    let (shorter, longer, short_len, long_len) = if len_a <= len_b {
        (a, b, len_a, len_b)
    } else {
        (b, a, len_b, len_a)
    };

    let aligned = longer
        .match_indices(shorter)
        .any(|(start, _)| starts_word(longer, start) && ends_word(longer, start + shorter.len()));
    if !aligned {
        return None;
    }
    let ratio = short_len as f64 / long_len as f64;
    Some(CONTAINMENT_BASE + CONTAINMENT_SPAN * ratio)
}

/// Whether byte offset `start` begins a token, optionally after a single
/// Hebrew prefix letter that itself begins the token.
fn starts_word(text: &str, start: usize) -> bool {
    let mut before = text[..start].chars().rev();
    match before.next() {
        None | Some(' ') => true,
        Some(c) if HEBREW_PREFIXES.contains(&c) => matches!(before.next(), None | Some(' ')),
        Some(_) => false,
    }
}

fn ends_word(text: &str, end: usize) -> bool {
    text[end..].chars().next().map_or(true, |c| c == ' ')
}

fn token_overlap_score(a: &str, b: &str) -> Option<f64> {
    let tokens_a: HashSet<&str> = a.split_whitespace().collect();
    let tokens_b: HashSet<&str> = b.split_whitespace().collect();

    let shared = tokens_a.intersection(&tokens_b).count();
    if shared == 0 {
        return None;
    }
    let overlap = shared as f64 / tokens_a.len().max(tokens_b.len()) as f64;
    if overlap < MIN_TOKEN_OVERLAP {
        return None;
    }
    Some(TOKEN_BASE + TOKEN_SPAN * overlap)
}

fn edit_distance_score(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 0.0;
    }
    let distance = levenshtein_distance(a, b);
    (1.0 - distance as f64 / max_len as f64).max(0.0)
}
