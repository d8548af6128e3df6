//! Cached, counted front door for credit lookups.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::aggregator::CreditAggregator;
use crate::cache::CreditsCache;
use crate::credits::CreditsResult;
use crate::metrics::MetricsSink;

pub const NOT_FOUND_MESSAGE: &str = "No credits found. Check spelling or try the full official title.";
const CACHE_KEY_PREFIX: &str = "song_credits_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found { credits: CreditsResult, cached: bool },
    NotFound { message: String },
}

/// Case-insensitive cache key for an `(artist, title)` query.
pub fn cache_key(artist: &str, title: &str) -> String {
    let material = format!("{}|{}", artist.to_lowercase(), title.to_lowercase());
    format!("{CACHE_KEY_PREFIX}{:x}", md5::compute(material.as_bytes()))
}

pub struct CreditsLookup {
    aggregator: CreditAggregator,
    cache: Option<Box<dyn CreditsCache>>,
    metrics: Arc<dyn MetricsSink>,
    cache_ttl: Duration,
}

impl CreditsLookup {
    pub fn new(aggregator: CreditAggregator, metrics: Arc<dyn MetricsSink>, cache_ttl: Duration) -> Self {
        Self {
            aggregator,
            cache: None,
            metrics,
            cache_ttl,
        }
    }

    pub fn with_cache(mut self, cache: Box<dyn CreditsCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn lookup(&self, artist: &str, title: &str) -> LookupOutcome {
        let started = Instant::now();
        self.metrics.increment("total_requests", 1);
        let outcome = self.resolve(artist, title);
        self.metrics.record_latency(started.elapsed());
        outcome
    }

    fn resolve(&self, artist: &str, title: &str) -> LookupOutcome {
        let key = cache_key(artist, title);

        if let Some(cached) = self.cached(&key) {
            self.metrics.increment("cache_hits", 1);
            self.count_success(&cached);
            return LookupOutcome::Found {
                credits: cached,
                cached: true,
            };
        }
        self.metrics.increment("cache_misses", 1);

        let credits = self.aggregator.fetch_credits(artist, title);
        if credits.categories.is_empty() {
            self.metrics.increment("failed_lookups", 1);
            info!("No credits found for {:?} / {:?}", artist, title);
            return LookupOutcome::NotFound {
                message: NOT_FOUND_MESSAGE.to_string(),
            };
        }

        if let Some(cache) = &self.cache {
            if let Err(err) = cache.set(&key, &credits, self.cache_ttl) {
                warn!("Failed to cache credits for {:?} / {:?}: {}", artist, title, err);
            }
        }
        self.count_success(&credits);
        LookupOutcome::Found {
            credits,
            cached: false,
        }
    }

    fn cached(&self, key: &str) -> Option<CreditsResult> {
        match self.cache.as_ref()?.get(key) {
            Ok(hit) => hit,
            Err(err) => {
                warn!("Cache read failed for {}: {}", key, err);
                None
            }
        }
    }

    fn count_success(&self, credits: &CreditsResult) {
        self.metrics.increment("successful_lookups", 1);
        for source in &credits.sources {
            self.metrics.increment(&format!("source:{source}"), 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SqliteCreditsCache;
    use crate::config::CreditsConfig;
    use crate::metrics::LookupMetrics;
    use crate::sources::musicbrainz::tests::{
        superstition_transport, SUPERSTITION_DETAIL, SUPERSTITION_SEARCH, SUPERSTITION_WORK,
    };
    use crate::test_support::{status_response, ScriptedTransport, TestHarness};

    fn lookup_with(transport: ScriptedTransport, metrics: Arc<LookupMetrics>) -> CreditsLookup {
        let config = CreditsConfig::default();
        let harness = TestHarness::from_transport(&config, transport);
        let aggregator = CreditAggregator::with_fetcher(&config, harness.fetcher);
        let cache = SqliteCreditsCache::open_in_memory().expect("cache");
        CreditsLookup::new(aggregator, metrics, config.cache_ttl()).with_cache(Box::new(cache))
    }

    #[test]
    fn test_cache_key_is_case_insensitive() {
        let key = cache_key("Stevie Wonder", "Superstition");
        assert_eq!(key, cache_key("stevie wonder", "SUPERSTITION"));
        assert!(key.starts_with("song_credits_"));
        assert_eq!(key.len(), "song_credits_".len() + 32);
        assert_ne!(key, cache_key("Stevie Wonder", "Sir Duke"));
    }

    #[test]
    fn test_miss_then_hit() {
        let transport = superstition_transport();
        let metrics = Arc::new(LookupMetrics::new());
        let lookup = lookup_with(transport.clone(), metrics.clone());

        let first = lookup.lookup("Stevie Wonder", "Superstition");
        let LookupOutcome::Found { credits, cached } = first else {
            panic!("expected credits on the first lookup");
        };
        assert!(!cached);
        assert_eq!(credits.sources, vec!["MusicBrainz".to_string()]);

        let second = lookup.lookup("stevie wonder", "superstition");
        assert_eq!(
            second,
            LookupOutcome::Found {
                credits,
                cached: true
            }
        );
        assert_eq!(transport.requests().len(), 3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.counter("total_requests"), 2);
        assert_eq!(snapshot.counter("cache_misses"), 1);
        assert_eq!(snapshot.counter("cache_hits"), 1);
        assert_eq!(snapshot.counter("successful_lookups"), 2);
        assert_eq!(snapshot.counter("source:MusicBrainz"), 2);
    }

    #[test]
    fn test_empty_result_is_not_found_and_not_cached() {
        let transport = ScriptedTransport::default()
            .route("ws/2/recording/?query=", Ok(status_response(404)))
            .route("action=wbsearchentities", Ok(status_response(404)))
            .route("ws/2/recording/?query=", Ok(status_response(404)))
            .route("action=wbsearchentities", Ok(status_response(404)));
        let metrics = Arc::new(LookupMetrics::new());
        let lookup = lookup_with(transport.clone(), metrics.clone());

        for _ in 0..2 {
            assert_eq!(
                lookup.lookup("Nobody", "Nothing"),
                LookupOutcome::NotFound {
                    message: NOT_FOUND_MESSAGE.to_string()
                }
            );
        }
        assert_eq!(transport.requests().len(), 4);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.counter("failed_lookups"), 2);
        assert_eq!(snapshot.counter("cache_hits"), 0);
    }

    #[test]
    fn test_lookup_without_cache_always_fetches() {
        let config = CreditsConfig::default();
        let transport = superstition_transport()
            .route_json("ws/2/recording/?query=", SUPERSTITION_SEARCH)
            .route_json("ws/2/recording/rec-1?", SUPERSTITION_DETAIL)
            .route_json("ws/2/work/work-1?", SUPERSTITION_WORK);
        let harness = TestHarness::from_transport(&config, transport.clone());
        let aggregator = CreditAggregator::with_fetcher(&config, harness.fetcher);
        let lookup = CreditsLookup::new(aggregator, Arc::new(LookupMetrics::new()), config.cache_ttl());

        for _ in 0..2 {
            assert!(matches!(
                lookup.lookup("Stevie Wonder", "Superstition"),
                LookupOutcome::Found { cached: false, .. }
            ));
        }
        assert_eq!(transport.requests().len(), 6);
    }
}
