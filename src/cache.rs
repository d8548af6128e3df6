//! Expiring key/value store for finished lookups.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};

use crate::credits::CreditsResult;
use crate::error::CacheError;

/// `get by key / set with TTL` contract used by the lookup service.
pub trait CreditsCache {
    fn get(&self, key: &str) -> Result<Option<CreditsResult>, CacheError>;
    fn set(&self, key: &str, value: &CreditsResult, ttl: Duration) -> Result<(), CacheError>;
}

fn now_unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

pub struct SqliteCreditsCache {
    conn: Connection,
}

impl SqliteCreditsCache {
    /// Opens (creating if needed) the cache database at `path`.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// `<data dir>/song-credits/cache.db`.
    pub fn default_path() -> std::path::PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join("song-credits")
            .join("cache.db")
    }

    fn with_connection(conn: Connection) -> Result<Self, CacheError> {
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<(), CacheError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS credits_cache (
                cache_key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                expires_unix_ms INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Deletes expired rows and returns how many were removed.
    pub fn prune_expired(&self) -> Result<usize, CacheError> {
        let removed = self.conn.execute(
            "DELETE FROM credits_cache WHERE expires_unix_ms <= ?1",
            params![now_unix_ms()],
        )?;
        Ok(removed)
    }

    /// Deletes every cached lookup and returns how many were removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let removed = self.conn.execute("DELETE FROM credits_cache", [])?;
        Ok(removed)
    }

    pub fn len(&self) -> Result<usize, CacheError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM credits_cache", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}

impl CreditsCache for SqliteCreditsCache {
    fn get(&self, key: &str) -> Result<Option<CreditsResult>, CacheError> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM credits_cache WHERE cache_key = ?1 AND expires_unix_ms > ?2",
                params![key, now_unix_ms()],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &CreditsResult, ttl: Duration) -> Result<(), CacheError> {
        let payload = serde_json::to_string(value)?;
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires = now_unix_ms().saturating_add(ttl_ms);
        self.conn.execute(
            "INSERT INTO credits_cache (cache_key, payload, expires_unix_ms) VALUES (?1, ?2, ?3)
             ON CONFLICT(cache_key) DO UPDATE SET payload = excluded.payload,
                 expires_unix_ms = excluded.expires_unix_ms",
            params![key, payload, expires],
        )?;
        Ok(())
    }
}
