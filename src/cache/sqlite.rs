//! Persistent SQLite cache backend

use crate::cache::{CacheResult, CacheStore};
use crate::fetch::FetchResult;
use crate::CacheError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Durable response cache backed by a SQLite file.
///
/// Same contract and key scheme as [`crate::cache::MemoryCache`], but
/// entries survive process restarts. Expiry timestamps are stored as unix
/// milliseconds so TTL checks work across runs.
pub struct SqliteCache {
    conn: Connection,
    maxsize: usize,
}

impl SqliteCache {
    /// Opens (or creates) the cache database at `path`.
    pub fn new(path: &Path, maxsize: usize) -> CacheResult<Self> {
        assert!(maxsize > 0, "cache maxsize must be at least 1");

        let conn = Connection::open(path).map_err(backend_err)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;

             CREATE TABLE IF NOT EXISTS http_cache (
                 key        TEXT PRIMARY KEY,
                 url        TEXT NOT NULL,
                 status     INTEGER NOT NULL,
                 body       BLOB NOT NULL,
                 headers    TEXT NOT NULL,
                 fetched_at TEXT NOT NULL,
                 expires_at INTEGER NOT NULL,
                 last_used  INTEGER NOT NULL
             );

             CREATE INDEX IF NOT EXISTS idx_http_cache_last_used
                 ON http_cache (last_used);",
        )
        .map_err(backend_err)?;

        Ok(Self { conn, maxsize })
    }

    fn purge_expired(&self, now_ms: i64) -> CacheResult<()> {
        self.conn
            .execute("DELETE FROM http_cache WHERE expires_at <= ?1", [now_ms])
            .map_err(backend_err)?;
        Ok(())
    }
}

impl CacheStore for SqliteCache {
    fn has(&mut self, key: &str) -> CacheResult<bool> {
        let now_ms = Utc::now().timestamp_millis();
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM http_cache WHERE key = ?1 AND expires_at > ?2",
                params![key, now_ms],
                |row| row.get(0),
            )
            .optional()
            .map_err(backend_err)?;
        Ok(found.is_some())
    }

    fn get(&mut self, key: &str) -> CacheResult<Option<FetchResult>> {
        let now_ms = Utc::now().timestamp_millis();

        // Lazy purge of this key if it expired.
        self.conn
            .execute(
                "DELETE FROM http_cache WHERE key = ?1 AND expires_at <= ?2",
                params![key, now_ms],
            )
            .map_err(backend_err)?;

        let row: Option<(String, u16, Vec<u8>, String, String)> = self
            .conn
            .query_row(
                "SELECT url, status, body, headers, fetched_at
                 FROM http_cache WHERE key = ?1",
                [key],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .optional()
            .map_err(backend_err)?;

        let Some((url, status, body, headers, fetched_at)) = row else {
            return Ok(None);
        };

        // Touch-on-read keeps hot entries out of the LRU victim slot.
        self.conn
            .execute(
                "UPDATE http_cache SET last_used = ?1 WHERE key = ?2",
                params![now_ms, key],
            )
            .map_err(backend_err)?;

        let url = Url::parse(&url)
            .map_err(|e| CacheError::Encode(format!("stored URL unparseable: {}", e)))?;
        let headers: HashMap<String, String> = serde_json::from_str(&headers)
            .map_err(|e| CacheError::Encode(format!("stored headers unparseable: {}", e)))?;
        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
            .map_err(|e| CacheError::Encode(format!("stored timestamp unparseable: {}", e)))?
            .with_timezone(&Utc);

        Ok(Some(FetchResult {
            url,
            status,
            body,
            headers,
            fetched_at,
            from_cache: false,
        }))
    }

    fn set(&mut self, key: &str, value: &FetchResult, ttl: Duration) -> CacheResult<()> {
        let now_ms = Utc::now().timestamp_millis();
        let expires_at = now_ms + ttl.as_millis() as i64;
        let headers = serde_json::to_string(&value.headers)
            .map_err(|e| CacheError::Encode(e.to_string()))?;

        let exists: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM http_cache WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(backend_err)?;

        if exists.is_none() {
            self.purge_expired(now_ms)?;
            let count: usize = self
                .conn
                .query_row("SELECT COUNT(*) FROM http_cache", [], |row| row.get(0))
                .map_err(backend_err)?;
            if count >= self.maxsize {
                self.conn
                    .execute(
                        "DELETE FROM http_cache WHERE key =
                             (SELECT key FROM http_cache ORDER BY last_used ASC LIMIT 1)",
                        [],
                    )
                    .map_err(backend_err)?;
            }
        }

        self.conn
            .execute(
                "INSERT OR REPLACE INTO http_cache
                     (key, url, status, body, headers, fetched_at, expires_at, last_used)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    key,
                    value.url.as_str(),
                    value.status,
                    value.body,
                    headers,
                    value.fetched_at.to_rfc3339(),
                    expires_at,
                    now_ms,
                ],
            )
            .map_err(backend_err)?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> CacheResult<()> {
        self.conn
            .execute("DELETE FROM http_cache WHERE key = ?1", [key])
            .map_err(backend_err)?;
        Ok(())
    }

    fn clear(&mut self) -> CacheResult<()> {
        self.conn
            .execute("DELETE FROM http_cache", [])
            .map_err(backend_err)?;
        Ok(())
    }

    fn len(&mut self) -> CacheResult<usize> {
        let now_ms = Utc::now().timestamp_millis();
        self.purge_expired(now_ms)?;
        self.conn
            .query_row("SELECT COUNT(*) FROM http_cache", [], |row| row.get(0))
            .map_err(backend_err)
    }
}

fn backend_err(e: rusqlite::Error) -> CacheError {
    CacheError::Backend(e.to_string())
}
