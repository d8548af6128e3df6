use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{debug, info, warn};

use song_credits::config::{default_config_path, load_config};
use song_credits::credential_store::{self, DEFAULT_ACCOUNT};
use song_credits::{
    CreditAggregator, CreditsConfig, CreditsLookup, LogDiagnostics, LookupMetrics, LookupOutcome,
    SqliteCreditsCache,
};

const MAX_QUERY_CHARS: usize = 200;

#[derive(Parser)]
#[command(name = "song-credits")]
#[command(about = "Look up songwriters, performers, producers and engineers for a song")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging, including API diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve credits for a song and print them as JSON
    Lookup {
        artist: String,
        title: String,

        /// Skip the lookup cache
        #[arg(long)]
        no_cache: bool,

        /// Cache database path
        #[arg(long)]
        cache: Option<PathBuf>,
    },
    /// Check that each provider is reachable
    TestConnections,
    /// Store the Discogs token in the system keyring
    SetDiscogsToken {
        token: String,

        #[arg(long, default_value = DEFAULT_ACCOUNT)]
        account: String,
    },
    /// Remove the Discogs token from the system keyring
    ClearDiscogsToken {
        #[arg(long, default_value = DEFAULT_ACCOUNT)]
        account: String,
    },
    /// Remove every cached lookup
    ClearCache {
        /// Cache database path
        #[arg(long)]
        cache: Option<PathBuf>,
    },
}

fn validate_query_field(label: &str, value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{label} must not be empty"));
    }
    if trimmed.chars().count() > MAX_QUERY_CHARS {
        return Err(format!("{label} must be at most {MAX_QUERY_CHARS} characters"));
    }
    Ok(trimmed.to_string())
}

fn resolve_config(path: Option<PathBuf>) -> CreditsConfig {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = load_config(&path);
    debug!("Loaded config from {}", path.display());

    if config.discogs_token().is_none() {
        match credential_store::get_discogs_token(DEFAULT_ACCOUNT) {
            Ok(Some(token)) => {
                debug!("Using Discogs token from system keyring");
                config.discogs_token = token.trim().to_string();
            }
            Ok(None) => {}
            Err(err) => warn!("{}", err),
        }
    }
    config
}

fn build_lookup(
    config: &CreditsConfig,
    verbose: bool,
    metrics: Arc<LookupMetrics>,
) -> CreditAggregator {
    let diagnostics = LogDiagnostics::new(verbose || config.debug_logging).with_metrics(metrics);
    CreditAggregator::new(config, Arc::new(diagnostics))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Debug);
    clog.init();
    log::set_max_level(if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });

    let config = resolve_config(cli.config);
    if config.debug_logging {
        log::set_max_level(log::LevelFilter::Debug);
    }

    match cli.command {
        Commands::Lookup {
            artist,
            title,
            no_cache,
            cache,
        } => {
            let artist = validate_query_field("artist", &artist)?;
            let title = validate_query_field("title", &title)?;

            let metrics = Arc::new(LookupMetrics::new());
            let aggregator = build_lookup(&config, cli.verbose, metrics.clone());
            let mut lookup = CreditsLookup::new(aggregator, metrics.clone(), config.cache_ttl());
            if !no_cache {
                let cache_path = cache.unwrap_or_else(SqliteCreditsCache::default_path);
                match SqliteCreditsCache::open(&cache_path) {
                    Ok(store) => {
                        if let Err(err) = store.prune_expired() {
                            warn!("Failed to prune cache {}: {}", cache_path.display(), err);
                        }
                        lookup = lookup.with_cache(Box::new(store));
                    }
                    Err(err) => warn!(
                        "Cache unavailable at {} ({}). Continuing without it.",
                        cache_path.display(),
                        err
                    ),
                }
            }

            match lookup.lookup(&artist, &title) {
                LookupOutcome::Found { credits, cached } => {
                    if cached {
                        info!("Served from cache");
                    }
                    println!("{}", serde_json::to_string_pretty(&credits)?);
                }
                LookupOutcome::NotFound { message } => println!("{message}"),
            }
            debug!("Lookup metrics: {:?}", metrics.snapshot());
        }
        Commands::TestConnections => {
            let metrics = Arc::new(LookupMetrics::new());
            let aggregator = build_lookup(&config, cli.verbose, metrics);
            for status in aggregator.test_connections() {
                let marker = if status.ok { "ok" } else { "FAIL" };
                println!("{:<12} {:<4} {}", status.source, marker, status.message);
            }
        }
        Commands::SetDiscogsToken { token, account } => {
            let token = validate_query_field("token", &token)?;
            credential_store::set_discogs_token(&account, &token)?;
            info!("Saved Discogs token for account '{}'", account);
        }
        Commands::ClearDiscogsToken { account } => {
            credential_store::delete_discogs_token(&account)?;
            info!("Removed Discogs token for account '{}'", account);
        }
        Commands::ClearCache { cache } => {
            let cache_path = cache.unwrap_or_else(SqliteCreditsCache::default_path);
            let store = SqliteCreditsCache::open(&cache_path)?;
            let removed = store.clear()?;
            info!("Removed {} cached lookups from {}", removed, cache_path.display());
        }
    }

    Ok(())
}
