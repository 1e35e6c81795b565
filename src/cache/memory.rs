//! Bounded in-memory cache backend

use crate::cache::{CacheResult, CacheStore};
use crate::fetch::FetchResult;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// In-memory response cache bounded by `maxsize`.
///
/// Eviction is least-recently-used with touch-on-read: `get` refreshes an
/// entry's recency, so an entry that keeps producing cache hits survives
/// inserts that push colder entries out. Expired entries are purged lazily
/// on the next operation that touches them.
#[derive(Debug)]
pub struct MemoryCache {
    maxsize: usize,
    entries: HashMap<String, Entry>,
}

#[derive(Debug)]
struct Entry {
    value: FetchResult,
    expires_at: Instant,
    last_used: Instant,
}

impl MemoryCache {
    pub fn new(maxsize: usize) -> Self {
        assert!(maxsize > 0, "cache maxsize must be at least 1");
        Self {
            maxsize,
            entries: HashMap::new(),
        }
    }

    /// Drops the entry if its TTL has passed. Returns whether a live entry
    /// remains.
    fn purge_if_expired(&mut self, key: &str, now: Instant) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.expires_at <= now => {
                self.entries.remove(key);
                tracing::trace!("Cache entry {} expired", key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Evicts the least recently used entry to make room for an insert.
    fn evict_lru(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            tracing::debug!("Evicting LRU cache entry {}", key);
            self.entries.remove(&key);
        }
    }

    #[cfg(test)]
    fn force_expire(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.expires_at = Instant::now() - Duration::from_secs(1);
        }
    }

    #[cfg(test)]
    fn backdate_last_used(&mut self, key: &str, by: Duration) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.last_used -= by;
        }
    }
}

impl CacheStore for MemoryCache {
    fn has(&mut self, key: &str) -> CacheResult<bool> {
        Ok(self.purge_if_expired(key, Instant::now()))
    }

    fn get(&mut self, key: &str) -> CacheResult<Option<FetchResult>> {
        let now = Instant::now();
        if !self.purge_if_expired(key, now) {
            return Ok(None);
        }

        let entry = self.entries.get_mut(key).map(|entry| {
            entry.last_used = now;
            entry.value.clone()
        });
        Ok(entry)
    }

    fn set(&mut self, key: &str, value: &FetchResult, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();

        // Replacing an existing key never needs an eviction.
        if !self.entries.contains_key(key) && self.entries.len() >= self.maxsize {
            self.evict_lru();
        }

        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.clone(),
                expires_at: now + ttl,
                last_used: now,
            },
        );
        Ok(())
    }

    fn delete(&mut self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> CacheResult<()> {
        self.entries.clear();
        Ok(())
    }

    fn len(&mut self) -> CacheResult<usize> {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        Ok(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap as StdHashMap;
    use url::Url;

    fn create_test_result(url: &str) -> FetchResult {
        FetchResult {
            url: Url::parse(url).unwrap(),
            status: 200,
            body: b"<html></html>".to_vec(),
            headers: StdHashMap::new(),
            fetched_at: Utc::now(),
            from_cache: false,
        }
    }

    const TTL: Duration = Duration::from_secs(3600);

    #[test]
    fn test_round_trip() {
        let mut cache = MemoryCache::new(10);
        let value = create_test_result("https://example.com/");

        cache.set("k1", &value, TTL).unwrap();
        assert!(cache.has("k1").unwrap());

        let got = cache.get("k1").unwrap().unwrap();
        assert_eq!(got.url, value.url);
        assert_eq!(got.body, value.body);
        assert_eq!(got.status, 200);
    }

    #[test]
    fn test_missing_key_absent() {
        let mut cache = MemoryCache::new(10);
        assert!(!cache.has("nope").unwrap());
        assert!(cache.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_expired_entry_treated_as_absent() {
        let mut cache = MemoryCache::new(10);
        cache
            .set("k1", &create_test_result("https://example.com/"), TTL)
            .unwrap();

        cache.force_expire("k1");
        assert!(!cache.has("k1").unwrap());
        assert!(cache.get("k1").unwrap().is_none());
        assert_eq!(cache.len().unwrap(), 0);
    }

    #[test]
    fn test_eviction_bound() {
        let mut cache = MemoryCache::new(3);
        for i in 0..4 {
            let value = create_test_result(&format!("https://example.com/{}", i));
            cache.set(&format!("k{}", i), &value, TTL).unwrap();
            // Separate recency so the LRU victim is deterministic.
            cache.backdate_last_used(&format!("k{}", i), Duration::from_millis(100 - i * 10));
        }

        assert_eq!(cache.len().unwrap(), 3);
        // k0 had the oldest last_used when k3 was inserted.
        assert!(!cache.has("k0").unwrap());
        assert!(cache.has("k1").unwrap());
        assert!(cache.has("k2").unwrap());
        assert!(cache.has("k3").unwrap());
    }

    #[test]
    fn test_get_refreshes_recency() {
        let mut cache = MemoryCache::new(2);
        cache
            .set("old", &create_test_result("https://example.com/old"), TTL)
            .unwrap();
        cache
            .set("new", &create_test_result("https://example.com/new"), TTL)
            .unwrap();
        cache.backdate_last_used("old", Duration::from_secs(10));
        cache.backdate_last_used("new", Duration::from_secs(5));

        // Touch "old" so "new" becomes the LRU victim.
        assert!(cache.get("old").unwrap().is_some());

        cache
            .set("next", &create_test_result("https://example.com/next"), TTL)
            .unwrap();

        assert!(cache.has("old").unwrap());
        assert!(!cache.has("new").unwrap());
        assert!(cache.has("next").unwrap());
    }

    #[test]
    fn test_replace_existing_key_does_not_evict() {
        let mut cache = MemoryCache::new(2);
        cache
            .set("k1", &create_test_result("https://example.com/1"), TTL)
            .unwrap();
        cache
            .set("k2", &create_test_result("https://example.com/2"), TTL)
            .unwrap();
        cache
            .set("k1", &create_test_result("https://example.com/1b"), TTL)
            .unwrap();

        assert_eq!(cache.len().unwrap(), 2);
        assert!(cache.has("k2").unwrap());
        let got = cache.get("k1").unwrap().unwrap();
        assert_eq!(got.url.as_str(), "https://example.com/1b");
    }

    #[test]
    fn test_delete_and_clear() {
        let mut cache = MemoryCache::new(10);
        cache
            .set("k1", &create_test_result("https://example.com/1"), TTL)
            .unwrap();
        cache
            .set("k2", &create_test_result("https://example.com/2"), TTL)
            .unwrap();

        cache.delete("k1").unwrap();
        assert!(!cache.has("k1").unwrap());
        assert!(cache.has("k2").unwrap());

        cache.clear().unwrap();
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn test_delete_missing_key_is_ok() {
        let mut cache = MemoryCache::new(10);
        assert!(cache.delete("ghost").is_ok());
    }
}
