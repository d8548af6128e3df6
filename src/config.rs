//! Lookup configuration model, defaults and loading.

use std::path::{Path, PathBuf};

use log::warn;

use crate::error::ConfigError;

const DEFAULT_CONTACT_EMAIL: &str = "admin@example.com";
const DEFAULT_CACHE_DURATION_HOURS: u32 = 24;
const MIN_CACHE_DURATION_HOURS: u32 = 1;
const MAX_CACHE_DURATION_HOURS: u32 = 168;
const CONFIG_DIR_NAME: &str = "song-credits";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Settings threaded into the fetch layer and the aggregator at construction.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct CreditsConfig {
    /// Contact address sent in the identification header.
    #[serde(default = "default_contact_email")]
    pub contact_email: String,
    /// Discogs personal access token. Empty means Discogs is skipped.
    #[serde(default)]
    pub discogs_token: String,
    /// Lifetime of cached lookups in hours.
    #[serde(default = "default_cache_duration_hours")]
    pub cache_duration_hours: u32,
    /// Emit bounded diagnostic events for API failures and retries.
    #[serde(default)]
    pub debug_logging: bool,
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            contact_email: default_contact_email(),
            discogs_token: String::new(),
            cache_duration_hours: default_cache_duration_hours(),
            debug_logging: false,
        }
    }
}

impl CreditsConfig {
    /// Identification header value sent with every request.
    pub fn user_agent(&self) -> String {
        format!(
            "SongCredits/{} ( {} )",
            env!("CARGO_PKG_VERSION"),
            self.contact_email
        )
    }

    /// Token to attach to Discogs requests, if one is configured.
    pub fn discogs_token(&self) -> Option<&str> {
        let token = self.discogs_token.trim();
        (!token.is_empty()).then_some(token)
    }

    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.cache_duration_hours) * 60 * 60)
    }
}

fn default_contact_email() -> String {
    DEFAULT_CONTACT_EMAIL.to_string()
}

fn default_cache_duration_hours() -> u32 {
    DEFAULT_CACHE_DURATION_HOURS
}

/// Clamps and trims loaded settings into their supported ranges.
pub fn sanitize_config(config: CreditsConfig) -> CreditsConfig {
    let email = config.contact_email.trim();
    let contact_email = if email.is_empty() || !email.contains('@') {
        warn!("Contact email {email:?} is invalid. Falling back to the default address");
        default_contact_email()
    } else {
        email.to_string()
    };

    let discogs_token = config.discogs_token.trim().to_string();
    if discogs_token.chars().any(char::is_whitespace) {
        warn!("Discogs token should not contain spaces");
    }

    CreditsConfig {
        contact_email,
        discogs_token,
        cache_duration_hours: config
            .cache_duration_hours
            .clamp(MIN_CACHE_DURATION_HOURS, MAX_CACHE_DURATION_HOURS),
        debug_logging: config.debug_logging,
    }
}

/// Default location of `config.toml` in the user's config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// Parses configuration text and sanitizes the result.
pub fn parse_config(text: &str) -> Result<CreditsConfig, ConfigError> {
    let parsed: CreditsConfig = toml::from_str(text)?;
    Ok(sanitize_config(parsed))
}

/// Loads configuration from `path`. Missing or malformed files yield defaults.
pub fn load_config(path: &Path) -> CreditsConfig {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return CreditsConfig::default();
        }
        Err(err) => {
            warn!(
                "Failed to read config {} ({}). Using defaults.",
                path.display(),
                err
            );
            return CreditsConfig::default();
        }
    };

    match parse_config(&text) {
        Ok(config) => config,
        Err(err) => {
            warn!(
                "Failed to parse config {} ({}). Using defaults.",
                path.display(),
                err
            );
            CreditsConfig::default()
        }
    }
}
