//! Response caching
//!
//! A cache entry maps a request fingerprint to a previously fetched
//! response, expiring after its TTL. Two backends implement one contract:
//! [`MemoryCache`] (bounded, in-process) and [`SqliteCache`] (durable across
//! restarts). The Fetcher treats backend failures as a degraded no-cache
//! mode, never as a fetch failure.

mod memory;
mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use crate::fetch::FetchResult;
use crate::CacheError;
use sha2::{Digest, Sha256};
use std::time::Duration;
use url::Url;

/// Result type alias for cache operations
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Storage contract shared by all cache backends
///
/// Expired entries are treated as absent by `has`/`get` and purged lazily.
/// Eviction policy when a backend is full is least-recently-used, where
/// `get` refreshes an entry's recency (touch-on-read).
pub trait CacheStore: Send {
    /// Returns true when a live (non-expired) entry exists for `key`.
    fn has(&mut self, key: &str) -> CacheResult<bool>;

    /// Retrieves a live entry, refreshing its recency.
    fn get(&mut self, key: &str) -> CacheResult<Option<FetchResult>>;

    /// Inserts or replaces an entry, evicting the least recently used entry
    /// if the backend is at capacity.
    fn set(&mut self, key: &str, value: &FetchResult, ttl: Duration) -> CacheResult<()>;

    /// Removes a single entry; absent keys are not an error.
    fn delete(&mut self, key: &str) -> CacheResult<()>;

    /// Removes every entry.
    fn clear(&mut self) -> CacheResult<()>;

    /// Number of live entries.
    fn len(&mut self) -> CacheResult<usize>;

    fn is_empty(&mut self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Derives the stable cache key for a request.
///
/// The key is the hex SHA-256 of the normalized URL; non-GET methods are
/// folded into the hash so a GET and a POST to the same URL never collide.
/// The same URL always maps to the same key regardless of call site.
pub fn fingerprint(url: &Url, method: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(crate::url::normalize_for_key(url).as_bytes());
    if !method.eq_ignore_ascii_case("GET") {
        hasher.update(b"\n");
        hasher.update(method.to_uppercase().as_bytes());
    }
    hex::encode(hasher.finalize())
}
