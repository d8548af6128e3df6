//! Error types shared by the fetch layer, adapters and collaborators.

use thiserror::Error;

/// Failure of a single upstream API call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The provider id is not one of the known sources.
    #[error("unsupported API source: {0}")]
    UnsupportedSource(String),

    /// The URL (or a redirect target) points outside the provider allowlist.
    #[error("blocked API host {host:?} for source {source_id}")]
    BlockedHost {
        /// Provider the request was issued for.
        source_id: String,
        /// Host that was rejected.
        host: String,
    },

    /// Network-level failure (connect, TLS, read, redirect loop).
    #[error("API request transport error: {0}")]
    Transport(String),

    /// Non-200 status after the retry budget was spent.
    #[error("API returned HTTP {0}")]
    HttpStatus(u16),

    /// Body was not valid JSON after the retry budget was spent.
    #[error("invalid JSON from API: {0}")]
    JsonDecode(String),
}

impl ApiError {
    /// Tag reported to the diagnostics sink for external counting.
    pub fn tag(&self) -> String {
        match self {
            Self::UnsupportedSource(_) => "unsupported_source".to_string(),
            Self::BlockedHost { .. } => "blocked_host".to_string(),
            Self::Transport(_) => "transport".to_string(),
            Self::HttpStatus(code) => format!("http_{code}"),
            Self::JsonDecode(_) => "json_decode".to_string(),
        }
    }

    /// Whether the fetch layer may try the same call again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UnsupportedSource(_) | Self::BlockedHost { .. } => false,
            Self::Transport(_) | Self::JsonDecode(_) => true,
            Self::HttpStatus(code) => is_retryable_status(*code),
        }
    }
}

/// Transient HTTP statuses worth another attempt.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 409 | 425 | 429 | 500 | 502 | 503 | 504)
}

/// Result alias for upstream API calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors raised by the lookup cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("cache payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("cache directory error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the OS keyring credential store.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("{operation} failed in system keyring for account '{account}': {detail}")]
    Keyring {
        operation: &'static str,
        account: String,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_tags() {
        assert_eq!(
            ApiError::UnsupportedSource("lastfm".into()).tag(),
            "unsupported_source"
        );
        assert_eq!(
            ApiError::BlockedHost {
                source_id: "musicbrainz".into(),
                host: "evil.example.com".into(),
            }
            .tag(),
            "blocked_host"
        );
        assert_eq!(ApiError::Transport("reset".into()).tag(), "transport");
        assert_eq!(ApiError::HttpStatus(503).tag(), "http_503");
        assert_eq!(ApiError::JsonDecode("eof".into()).tag(), "json_decode");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ApiError::HttpStatus(503).is_retryable());
        assert!(ApiError::HttpStatus(429).is_retryable());
        assert!(!ApiError::HttpStatus(404).is_retryable());
        assert!(ApiError::Transport("timed out".into()).is_retryable());
        assert!(!ApiError::UnsupportedSource("x".into()).is_retryable());
        for status in [408, 409, 425, 429, 500, 502, 503, 504] {
            assert!(is_retryable_status(status), "{status} should retry");
        }
        for status in [400, 401, 403, 404, 410, 501] {
            assert!(!is_retryable_status(status), "{status} should not retry");
        }
    }

    #[test]
    fn test_error_display_messages() {
        assert_eq!(ApiError::HttpStatus(404).to_string(), "API returned HTTP 404");
        let blocked = ApiError::BlockedHost {
            source_id: "musicbrainz".into(),
            host: "evil.example.com".into(),
        };
        assert!(blocked.to_string().contains("evil.example.com"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiError>();
        assert_send_sync::<CacheError>();
    }
}
