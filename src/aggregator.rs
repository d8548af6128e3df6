//! Runs the providers in priority order and folds their output into one
//! canonical [`CreditsResult`].

use std::sync::Arc;

use log::{debug, info};

use crate::config::CreditsConfig;
use crate::credits::CreditsResult;
use crate::diagnostics::DiagnosticsSink;
use crate::http::{request_url, HttpFetcher, SourceId};
use crate::sources::{discogs, musicbrainz, wikidata, CreditSource};

const PROBE_ARTIST: &str = "Stevie Wonder";
const PROBE_TITLE: &str = "Superstition";

/// Reachability of one provider.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ConnectionStatus {
    pub source: String,
    pub ok: bool,
    pub message: String,
}

impl ConnectionStatus {
    fn new(source: SourceId, ok: bool, message: impl Into<String>) -> Self {
        Self {
            source: source.label().to_string(),
            ok,
            message: message.into(),
        }
    }
}

pub struct CreditAggregator {
    fetcher: HttpFetcher,
    discogs_enabled: bool,
}

impl CreditAggregator {
    pub fn new(config: &CreditsConfig, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        Self::with_fetcher(config, HttpFetcher::new(config, diagnostics))
    }

    pub fn with_fetcher(config: &CreditsConfig, fetcher: HttpFetcher) -> Self {
        Self {
            fetcher,
            discogs_enabled: config.discogs_token().is_some(),
        }
    }

    /// Resolves `(artist, title)` into sanitized credits. Provider failures
    /// only reduce what is found; an empty category map means nothing was.
    pub fn fetch_credits(&self, artist: &str, title: &str) -> CreditsResult {
        let mut result = CreditsResult::new(artist, title);

        let mb = CreditSource::MusicBrainz.fetch(&self.fetcher, artist, title);
        if !mb.categories.is_empty() {
            result.categories.merge(&mb.categories);
            result.add_source(SourceId::MusicBrainz.label());
            if !mb.artist.is_empty() {
                result.artist = mb.artist;
            }
            if !mb.title.is_empty() {
                result.title = mb.title;
            }
            if !mb.year.is_empty() {
                result.year = mb.year;
            }
        }

        if self.discogs_enabled {
            let dc = CreditSource::Discogs.fetch(&self.fetcher, artist, title);
            if !dc.categories.is_empty() {
                result.categories.merge(&dc.categories);
                result.add_source(SourceId::Discogs.label());
            }
            if result.year.is_empty() && !dc.year.is_empty() {
                result.year = dc.year;
            }
        } else {
            debug!("Discogs skipped: no token configured");
        }

        if !result.has_performers() {
            let wd = CreditSource::Wikidata.fetch(&self.fetcher, artist, title);
            result.categories.merge(&wd.categories);
            if result.has_performers() {
                result.add_source(SourceId::Wikidata.label());
            }
        }

        let result = result.sanitized();
        info!(
            "Resolved {:?} / {:?}: {} credits from {:?}",
            result.artist,
            result.title,
            result.categories.total_entries(),
            result.sources
        );
        result
    }

    /// One cheap request per provider.
    pub fn test_connections(&self) -> Vec<ConnectionStatus> {
        let mut statuses = Vec::with_capacity(SourceId::ALL.len());

        let mb_query = format!("recording:\"{PROBE_TITLE}\" AND artist:\"{PROBE_ARTIST}\"");
        let mb_url = request_url(
            &format!("{}recording/", musicbrainz::API_BASE),
            &[("query", &mb_query), ("fmt", "json"), ("limit", "1")],
        );
        statuses.push(match self.fetcher.request(&mb_url, SourceId::MusicBrainz) {
            Ok(_) => ConnectionStatus::new(SourceId::MusicBrainz, true, "Reachable"),
            Err(err) => ConnectionStatus::new(SourceId::MusicBrainz, false, err.to_string()),
        });

        if self.discogs_enabled {
            let identity_url = format!("{}oauth/identity", discogs::API_BASE);
            statuses.push(match self.fetcher.request(&identity_url, SourceId::Discogs) {
                Ok(_) => ConnectionStatus::new(SourceId::Discogs, true, "Reachable and authenticated"),
                Err(err) => ConnectionStatus::new(SourceId::Discogs, false, err.to_string()),
            });
        } else {
            statuses.push(ConnectionStatus::new(
                SourceId::Discogs,
                false,
                "Skipped: no token configured",
            ));
        }

        let wd_url = request_url(
            wikidata::API_URL,
            &[
                ("action", "wbsearchentities"),
                ("search", PROBE_TITLE),
                ("language", "en"),
                ("type", "item"),
                ("limit", "1"),
                ("format", "json"),
            ],
        );
        statuses.push(match self.fetcher.request(&wd_url, SourceId::Wikidata) {
            Ok(_) => ConnectionStatus::new(SourceId::Wikidata, true, "Reachable"),
            Err(err) => ConnectionStatus::new(SourceId::Wikidata, false, err.to_string()),
        });

        statuses
    }
}
