//! Small text helpers shared by payload sanitizing, diagnostics and adapters.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*?>.*?</(script|style)>|<[^>]*>").expect("static markup pattern")
});
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(1[0-9]{3}|20[0-9]{2}|2100)\b").expect("static year pattern"));

/// Removes HTML-like tags (and script/style bodies).
pub fn strip_markup(value: &str) -> String {
    MARKUP_RE.replace_all(value, "").into_owned()
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Single-line, markup-free, trimmed text.
pub fn sanitize_text(value: &str) -> String {
    let stripped = strip_markup(value);
    let without_controls: String = stripped
        .chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect();
    collapse_whitespace(&without_controls)
}

/// Truncates to at most `max_chars` characters.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

/// Uppercases the first character, leaving the rest untouched.
pub fn upper_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Extracts a four-digit year from a date string.
pub fn extract_year(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    YEAR_RE
        .captures(trimmed)
        .map(|captures| captures[1].to_string())
        .unwrap_or_default()
}

/// Extracts a four-digit year from a JSON string or number.
pub fn extract_year_value(value: &Value) -> String {
    match value {
        Value::Number(number) => number
            .as_i64()
            .filter(|year| (1000..=9999).contains(year))
            .map(|year| year.to_string())
            .unwrap_or_default(),
        Value::String(text) => extract_year(text),
        _ => String::new(),
    }
}
