//! Song credit resolution across MusicBrainz, Discogs and Wikidata.
//!
//! [`CreditAggregator::fetch_credits`] runs the providers in priority order
//! and returns one deduplicated [`CreditsResult`]; [`CreditsLookup`] adds the
//! cache and metrics collaborators on top.

pub mod aggregator;
pub mod cache;
pub mod categorize;
pub mod config;
pub mod credential_store;
pub mod credits;
pub mod diagnostics;
pub mod error;
pub mod http;
pub mod lookup;
pub mod matching;
pub mod metrics;
pub mod sources;
pub mod text;

#[cfg(test)]
pub(crate) mod test_support;

pub use aggregator::{ConnectionStatus, CreditAggregator};
pub use cache::{CreditsCache, SqliteCreditsCache};
pub use config::CreditsConfig;
pub use credits::{CategoryMap, CreditCategory, CreditEntry, CreditsResult};
pub use diagnostics::{BoundedContext, DiagnosticsSink, LogDiagnostics};
pub use error::{ApiError, ApiResult};
pub use http::{HttpFetcher, SourceId};
pub use lookup::{CreditsLookup, LookupOutcome};
pub use matching::score_text_match;
pub use metrics::{LookupMetrics, MetricsSink};
