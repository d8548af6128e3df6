//! Tolerant artist/title matching used to pick candidates from search results.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::text::strip_markup;

static TRAILING_FEATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(feat|ft|featuring)\.?\s+.+$").expect("static feature pattern")
});
static PAREN_FEATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\([^)]*(feat|ft|featuring)[^)]*\)").expect("static parenthetical pattern")
});
static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static separator pattern"));

const SUBSTRING_BONUS: u32 = 40;
const TOKEN_OVERLAP_WEIGHT: f64 = 40.0;
const CHARACTER_SIMILARITY_WEIGHT: f64 = 0.2;

fn fold_diacritics(value: &str) -> String {
    let mut folded = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii() || !ch.is_alphabetic() {
            folded.push(ch);
        } else {
            folded.push_str(deunicode::deunicode_char(ch).unwrap_or(""));
        }
    }
    folded
}

/// Lowercase ASCII form used for comparisons: markup, accents, featured
/// artist clauses and punctuation are removed.
pub fn normalize_for_match(value: &str) -> String {
    let text = fold_diacritics(&strip_markup(value)).to_lowercase();
    let text = TRAILING_FEATURE_RE.replace(&text, "");
    let text = PAREN_FEATURE_RE.replace_all(&text, "");
    let text = text.replace('&', " and ");
    let text = NON_ALNUM_RE.replace_all(&text, " ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    // "ft/guest" only becomes a clause once punctuation turns into spaces.
    TRAILING_FEATURE_RE
        .replace(&collapsed, "")
        .trim()
        .to_string()
}

/// Similarity score in `0..=100` between a query and a candidate string.
pub fn score_text_match(needle: &str, haystack: &str) -> u32 {
    let a = normalize_for_match(needle);
    let b = normalize_for_match(haystack);

    if a.is_empty() || b.is_empty() {
        return 0;
    }
    if a == b {
        return 100;
    }

    let mut score = 0u32;
    if a.contains(b.as_str()) || b.contains(a.as_str()) {
        score += SUBSTRING_BONUS;
    }

    let a_tokens: HashSet<&str> = a.split(' ').filter(|token| !token.is_empty()).collect();
    let b_tokens: HashSet<&str> = b.split(' ').filter(|token| !token.is_empty()).collect();
    let union = a_tokens.union(&b_tokens).count();
    if union > 0 {
        let overlap = a_tokens.intersection(&b_tokens).count();
        score += (TOKEN_OVERLAP_WEIGHT * overlap as f64 / union as f64).round() as u32;
    }

    score += (similar_text_percent(&a, &b) * CHARACTER_SIMILARITY_WEIGHT).round() as u32;
    score.min(100)
}

/// Percentage of matching characters, counted by repeatedly taking the
/// longest common substring and recursing on both sides of it.
pub fn similar_text_percent(a: &str, b: &str) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    let common = similar_text(a.as_bytes(), b.as_bytes());
    common as f64 * 2.0 * 100.0 / total as f64
}

fn similar_text(a: &[u8], b: &[u8]) -> usize {
    let (pos_a, pos_b, max) = longest_common_substring(a, b);
    if max == 0 {
        return 0;
    }

    let mut sum = max;
    if pos_a > 0 && pos_b > 0 {
        sum += similar_text(&a[..pos_a], &b[..pos_b]);
    }
    if pos_a + max < a.len() && pos_b + max < b.len() {
        sum += similar_text(&a[pos_a + max..], &b[pos_b + max..]);
    }
    sum
}

// First longest run wins; later runs of equal length are ignored.
fn longest_common_substring(a: &[u8], b: &[u8]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    for i in 0..a.len() {
        for j in 0..b.len() {
            let mut len = 0;
            while i + len < a.len() && j + len < b.len() && a[i + len] == b[j + len] {
                len += 1;
            }
            if len > best.2 {
                best = (i, j, len);
            }
        }
    }
    best
}

/// Returns the index of the first candidate with the highest score.
pub fn best_index<T>(candidates: &[T], mut score: impl FnMut(&T) -> Option<f64>) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let Some(candidate_score) = score(candidate) else {
            continue;
        };
        if best.map_or(true, |(_, best_score)| candidate_score > best_score) {
            best = Some((index, candidate_score));
        }
    }
    best
}
