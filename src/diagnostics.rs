//! Bounded diagnostic events for API failures and retries.
//!
//! Events never carry response payloads or credentials: the context is capped
//! at a handful of short scalar fields, and token-like keys are dropped.

use std::sync::Arc;

use log::Level;

use crate::metrics::MetricsSink;
use crate::text::{sanitize_text, truncate_chars};

const MAX_CONTEXT_FIELDS: usize = 8;
const MAX_CONTEXT_VALUE_CHARS: usize = 200;

/// Small key/value context attached to a diagnostic event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundedContext {
    fields: Vec<(String, String)>,
}

impl BoundedContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field unless the context is full or the key looks secret.
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        if self.fields.len() >= MAX_CONTEXT_FIELDS {
            return self;
        }
        let key = sanitize_key(key);
        if key.is_empty() || key.contains("token") {
            return self;
        }
        let value = truncate_chars(
            &sanitize_text(&value.to_string()),
            MAX_CONTEXT_VALUE_CHARS,
        );
        self.fields.push((key, value));
        self
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == key)
            .map(|(_, value)| value.as_str())
    }

    fn to_json(&self) -> String {
        let map: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(key, value)| (key.clone(), serde_json::Value::String(value.clone())))
            .collect();
        serde_json::Value::Object(map).to_string()
    }
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .filter_map(|ch| {
            let lowered = ch.to_ascii_lowercase();
            (lowered.is_ascii_alphanumeric() || lowered == '_' || lowered == '-')
                .then_some(lowered)
        })
        .collect()
}

/// Observability collaborator receiving fetch-layer events.
pub trait DiagnosticsSink: Send + Sync {
    fn event(&self, level: Level, message: &str, context: &BoundedContext);
    /// `source` is the provider id as requested, which may not be a known one.
    fn api_error(&self, source: &str, tag: &str);
}

/// Default sink: renders events through `log` and counts API errors.
pub struct LogDiagnostics {
    enabled: bool,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl LogDiagnostics {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl DiagnosticsSink for LogDiagnostics {
    fn event(&self, level: Level, message: &str, context: &BoundedContext) {
        if !self.enabled {
            return;
        }
        log::log!(
            level,
            "SongCredits[{}] {} {}",
            level.as_str().to_ascii_uppercase(),
            sanitize_text(message),
            context.to_json()
        );
    }

    fn api_error(&self, source: &str, tag: &str) {
        if let Some(metrics) = &self.metrics {
            let source = truncate_chars(&sanitize_key(source), 32);
            metrics.increment(&format!("api_error:{}:{}", source, sanitize_key(tag)), 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::LookupMetrics;

    #[test]
    fn test_context_caps_field_count() {
        let mut context = BoundedContext::new();
        for index in 0..12 {
            context = context.with(&format!("field{index}"), index);
        }
        assert_eq!(context.fields().len(), 8);
        assert_eq!(context.get("field7"), Some("7"));
        assert_eq!(context.get("field8"), None);
    }

    #[test]
    fn test_context_drops_token_keys_and_truncates_values() {
        let long_value = "x".repeat(500);
        let context = BoundedContext::new()
            .with("discogs_token", "secret")
            .with("Auth-Token", "secret")
            .with("error", &long_value)
            .with("host", "musicbrainz.org");
        assert_eq!(context.get("discogs_token"), None);
        assert_eq!(context.get("auth-token"), None);
        assert_eq!(context.get("error").map(str::len), Some(200));
        assert_eq!(context.get("host"), Some("musicbrainz.org"));
    }

    #[test]
    fn test_context_sanitizes_keys_and_values() {
        let context = BoundedContext::new().with("Source ID!", "<b>music</b>\nbrainz");
        assert_eq!(context.get("sourceid"), Some("music brainz"));
    }

    #[test]
    fn test_log_diagnostics_counts_api_errors() {
        let metrics = Arc::new(LookupMetrics::new());
        let sink = LogDiagnostics::new(false).with_metrics(metrics.clone());
        sink.api_error("musicbrainz", "http_503");
        sink.api_error("musicbrainz", "http_503");
        sink.api_error("wikidata", "transport");
        sink.api_error("Last.FM", "unsupported_source");
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.counter("api_error:musicbrainz:http_503"), 2);
        assert_eq!(snapshot.counter("api_error:wikidata:transport"), 1);
        assert_eq!(snapshot.counter("api_error:lastfm:unsupported_source"), 1);
    }
}
