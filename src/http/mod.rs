//! Allowlisted JSON fetch layer shared by all source adapters.
//!
//! Every call is checked against the provider's host allowlist before any
//! network traffic, paced per provider, retried on transient failures and
//! reported to the diagnostics sink with a bounded context.

pub mod pacing;
pub mod ureq_transport;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use log::Level;
use serde_json::Value;

use crate::config::CreditsConfig;
use crate::diagnostics::{BoundedContext, DiagnosticsSink};
use crate::error::{ApiError, ApiResult};

pub use pacing::{RequestPacer, Sleeper, SourcePacer, ThreadSleeper};
pub use ureq_transport::UreqTransport;

const MAX_ATTEMPTS: u32 = 3;
const MAX_REDIRECTS: usize = 3;
const MAX_RETRY_AFTER_SECS: u64 = 10;

/// Known upstream providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    MusicBrainz,
    Discogs,
    Wikidata,
}

impl SourceId {
    pub const ALL: [SourceId; 3] = [Self::MusicBrainz, Self::Discogs, Self::Wikidata];

    /// Stable lowercase id used in diagnostics and config.
    pub fn id(self) -> &'static str {
        match self {
            Self::MusicBrainz => "musicbrainz",
            Self::Discogs => "discogs",
            Self::Wikidata => "wikidata",
        }
    }

    /// Display name recorded in `CreditsResult::sources`.
    pub fn label(self) -> &'static str {
        match self {
            Self::MusicBrainz => "MusicBrainz",
            Self::Discogs => "Discogs",
            Self::Wikidata => "Wikidata",
        }
    }

    /// Hosts this provider may be reached on.
    pub fn allowed_hosts(self) -> &'static [&'static str] {
        match self {
            Self::MusicBrainz => &["musicbrainz.org"],
            Self::Discogs => &["api.discogs.com"],
            Self::Wikidata => &["www.wikidata.org", "wikidata.org"],
        }
    }

    pub fn allows_host(self, host: &str) -> bool {
        let lowered = host.to_ascii_lowercase();
        self.allowed_hosts().iter().any(|allowed| *allowed == lowered)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SourceId {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "musicbrainz" => Ok(Self::MusicBrainz),
            "discogs" => Ok(Self::Discogs),
            "wikidata" => Ok(Self::Wikidata),
            other => Err(ApiError::UnsupportedSource(other.to_string())),
        }
    }
}

/// Response as seen by the fetch layer, independent of the HTTP client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub retry_after: Option<String>,
    pub location: Option<String>,
    pub body: String,
}

/// Single GET against the network. `Err` carries a transport-level message.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str, headers: &[(&'static str, String)]) -> Result<RawResponse, String>;
}

/// Builds `base?key=value&...` with percent-encoded values.
pub fn request_url(base: &str, params: &[(&str, &str)]) -> String {
    let mut url = base.to_string();
    if params.is_empty() {
        return url;
    }

    url.push('?');
    for (index, (key, value)) in params.iter().enumerate() {
        if index > 0 {
            url.push('&');
        }
        url.push_str(key);
        url.push('=');
        url.push_str(urlencoding::encode(value).as_ref());
    }
    url
}

fn parse_retry_after(value: Option<&str>) -> Option<u64> {
    value?.trim().parse::<u64>().ok().filter(|secs| *secs > 0)
}

fn is_redirect_status(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Allowlisted, paced, retrying JSON GET client.
pub struct HttpFetcher {
    transport: Box<dyn HttpTransport>,
    pacer: Box<dyn RequestPacer>,
    sleeper: Box<dyn Sleeper>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    user_agent: String,
    discogs_token: Option<String>,
}

impl HttpFetcher {
    /// Production fetcher: `ureq` transport, wall-clock pacing, thread sleeps.
    pub fn new(config: &CreditsConfig, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        Self::from_parts(
            config,
            Box::new(UreqTransport::new()),
            Box::new(SourcePacer::new()),
            Box::new(ThreadSleeper),
            diagnostics,
        )
    }

    pub fn from_parts(
        config: &CreditsConfig,
        transport: Box<dyn HttpTransport>,
        pacer: Box<dyn RequestPacer>,
        sleeper: Box<dyn Sleeper>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            transport,
            pacer,
            sleeper,
            diagnostics,
            user_agent: config.user_agent(),
            discogs_token: config.discogs_token().map(str::to_string),
        }
    }

    /// String-keyed entry point: unknown provider ids are rejected up front.
    pub fn request_named(&self, url: &str, source_id: &str) -> ApiResult<Value> {
        match source_id.parse::<SourceId>() {
            Ok(source) => self.request(url, source),
            Err(error) => {
                self.diagnostics.event(
                    Level::Error,
                    "Unsupported API source",
                    &BoundedContext::new().with("source", source_id),
                );
                self.diagnostics.api_error(source_id, &error.tag());
                log::error!("Unsupported API source {source_id:?}");
                Err(error)
            }
        }
    }

    /// GETs `url` for `source` and decodes the JSON body.
    pub fn request(&self, url: &str, source: SourceId) -> ApiResult<Value> {
        let host = self.check_host(url, source)?;
        let headers = self.headers_for(source);

        let mut attempt = 1u32;
        loop {
            let (error, retry_after) = match self.send_following_redirects(url, source, &headers) {
                Ok(response) if response.status == 200 => {
                    match serde_json::from_str::<Value>(&response.body) {
                        Ok(parsed) => return Ok(parsed),
                        Err(error) => {
                            self.diagnostics.event(
                                Level::Warn,
                                "API JSON decode error",
                                &BoundedContext::new()
                                    .with("source", source)
                                    .with("host", &host)
                                    .with("attempt", attempt),
                            );
                            (ApiError::JsonDecode(error.to_string()), None)
                        }
                    }
                }
                Ok(response) => {
                    self.diagnostics.event(
                        Level::Warn,
                        "API non-200 response",
                        &BoundedContext::new()
                            .with("source", source)
                            .with("host", &host)
                            .with("attempt", attempt)
                            .with("code", response.status),
                    );
                    (
                        ApiError::HttpStatus(response.status),
                        parse_retry_after(response.retry_after.as_deref()),
                    )
                }
                Err(ApiError::Transport(message)) => {
                    self.diagnostics.event(
                        Level::Warn,
                        "API request transport error",
                        &BoundedContext::new()
                            .with("source", source)
                            .with("host", &host)
                            .with("attempt", attempt)
                            .with("error", &message),
                    );
                    (ApiError::Transport(message), None)
                }
                // Redirect targets outside the allowlist are reported by check_host.
                Err(error) => return Err(error),
            };

            self.diagnostics.api_error(source.id(), &error.tag());
            if attempt >= MAX_ATTEMPTS || !error.is_retryable() {
                return Err(error);
            }

            let delay = retry_after
                .map(|secs| secs.min(MAX_RETRY_AFTER_SECS))
                .unwrap_or(u64::from(attempt))
                .max(1);
            self.diagnostics.event(
                Level::Info,
                "API retry scheduled",
                &BoundedContext::new()
                    .with("source", source)
                    .with("error", error.tag())
                    .with("attempt", attempt)
                    .with("retry_after", delay),
            );
            self.sleeper.sleep(Duration::from_secs(delay));
            attempt += 1;
        }
    }

    fn check_host(&self, url: &str, source: SourceId) -> ApiResult<String> {
        let host = url::Url::parse(url)
            .ok()
            .filter(|parsed| matches!(parsed.scheme(), "https" | "http"))
            .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase));

        match host {
            Some(host) if source.allows_host(&host) => Ok(host),
            other => {
                let host = other.unwrap_or_default();
                self.diagnostics.event(
                    Level::Warn,
                    "Blocked API host",
                    &BoundedContext::new()
                        .with("source", source)
                        .with("host", &host),
                );
                let error = ApiError::BlockedHost {
                    source_id: source.id().to_string(),
                    host,
                };
                self.diagnostics.api_error(source.id(), &error.tag());
                Err(error)
            }
        }
    }

    fn headers_for(&self, source: SourceId) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("User-Agent", self.user_agent.clone()),
            ("Accept", "application/json".to_string()),
        ];
        if source == SourceId::Discogs {
            if let Some(token) = &self.discogs_token {
                headers.push(("Authorization", format!("Discogs token={token}")));
            }
        }
        headers
    }

    fn send_following_redirects(
        &self,
        url: &str,
        source: SourceId,
        headers: &[(&'static str, String)],
    ) -> ApiResult<RawResponse> {
        let mut current = url.to_string();
        let mut hops = 0usize;
        loop {
            self.pacer.wait_turn(source, self.sleeper.as_ref());
            let response = self
                .transport
                .get(&current, headers)
                .map_err(ApiError::Transport)?;

            let location = match (&response.location, is_redirect_status(response.status)) {
                (Some(location), true) => location.clone(),
                _ => return Ok(response),
            };

            hops += 1;
            if hops > MAX_REDIRECTS {
                return Err(ApiError::Transport(format!(
                    "too many redirects (more than {MAX_REDIRECTS})"
                )));
            }

            let next = url::Url::parse(&current)
                .and_then(|base| base.join(&location))
                .map_err(|error| ApiError::Transport(format!("invalid redirect target: {error}")))?;
            self.check_host(next.as_str(), source)?;
            log::debug!("Following redirect for {} to {}", source, next);
            current = next.to_string();
        }
    }
}
