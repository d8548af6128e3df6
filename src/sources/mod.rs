//! Provider adapters. Each one searches its provider, picks the best
//! candidate and turns the detail documents into categorized credits.

pub mod discogs;
pub mod musicbrainz;
pub mod wikidata;

use serde_json::Value;

use crate::credits::CategoryMap;
use crate::http::HttpFetcher;

/// What one provider contributed to a lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceCredits {
    /// Revised artist display name, when the provider reports one.
    pub artist: String,
    /// Revised title, when the provider reports one.
    pub title: String,
    pub year: String,
    pub categories: CategoryMap,
}

/// The closed set of providers the aggregator can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditSource {
    MusicBrainz,
    Discogs,
    Wikidata,
}

impl CreditSource {
    /// Runs the provider's search and detail requests. Failures yield an
    /// empty or partial contribution, never an error.
    pub fn fetch(self, fetcher: &HttpFetcher, artist: &str, title: &str) -> SourceCredits {
        match self {
            Self::MusicBrainz => musicbrainz::fetch(fetcher, artist, title),
            Self::Discogs => discogs::fetch(fetcher, artist, title),
            Self::Wikidata => wikidata::fetch(fetcher, artist, title),
        }
    }
}

/// Non-empty string at `value`, if any.
pub(crate) fn json_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|text| !text.trim().is_empty())
}

/// Provider ids arrive as strings or numbers depending on the endpoint.
pub(crate) fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub(crate) fn json_array(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or(&[])
}
