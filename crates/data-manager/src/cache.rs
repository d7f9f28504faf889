//! Time-expiring, size-bounded cache for content-API responses

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use lru::LruCache;
use serde::Serialize;
use serde_json::{json, Value};

use crate::transport::Method;

/// Millisecond wall clock, injectable for tests
pub trait Clock {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock advanced by hand
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Cache key: the resolved URL plus the method and body of the request
pub fn cache_key(url: &str, method: Method, body: Option<&Value>) -> String {
    format!("{}_{}", url, json!({ "method": method.as_str(), "body": body }))
}

/// A successful response body with the status it arrived with
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub status: u16,
    pub data: Value,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    response: CachedResponse,
    inserted_at_ms: i64,
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entry_count: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Entries are read with `peek`, so recency never changes and capacity
/// eviction drops the oldest insertion.
pub struct RequestCache {
    entries: LruCache<String, CacheEntry>,
    ttl_ms: i64,
    hits: u64,
    misses: u64,
}

impl RequestCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            ttl_ms: ttl.as_millis() as i64,
            hits: 0,
            misses: 0,
        }
    }

    /// Fresh data for `key`; stale entries count as misses
    pub fn get(&mut self, key: &str, now_ms: i64) -> Option<CachedResponse> {
        let fresh = self
            .entries
            .peek(key)
            .filter(|entry| now_ms - entry.inserted_at_ms < self.ttl_ms)
            .map(|entry| entry.response.clone());

        match fresh {
            Some(response) => {
                self.hits += 1;
                log::debug!("Cache hit: {}", key);
                Some(response)
            }
            None => {
                self.misses += 1;
                log::debug!("Cache miss: {}", key);
                None
            }
        }
    }

    /// Store `response`, replacing any previous entry wholesale
    pub fn insert(&mut self, key: String, response: CachedResponse, now_ms: i64) {
        // Re-inserting moves the key to the newest position
        self.entries.pop(&key);
        if let Some((evicted, _)) = self.entries.push(
            key,
            CacheEntry {
                response,
                inserted_at_ms: now_ms,
            },
        ) {
            log::debug!("Cache full, evicted {}", evicted);
        }
    }

    /// Drop entries whose age reached the TTL
    pub fn cleanup(&mut self, now_ms: i64) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| now_ms - entry.inserted_at_ms >= self.ttl_ms)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.pop(key);
        }
        expired.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.entries.len(),
            capacity: self.entries.cap().get(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE_MINUTES: Duration = Duration::from_secs(300);

    fn ok(data: Value) -> CachedResponse {
        CachedResponse { status: 200, data }
    }

    #[test]
    fn test_hit_within_ttl_miss_after() {
        let clock = ManualClock::new(1_000_000);
        let mut cache = RequestCache::new(FIVE_MINUTES, 100);
        let key = cache_key("https://backend.spacetechs.net/api/projects", Method::Get, None);

        cache.insert(key.clone(), ok(json!({ "data": [] })), clock.now_ms());

        clock.advance(Duration::from_millis(299_999));
        assert!(cache.get(&key, clock.now_ms()).is_some());

        clock.advance(Duration::from_millis(2));
        assert!(cache.get(&key, clock.now_ms()).is_none());

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn test_capacity_evicts_oldest_insertion() {
        let mut cache = RequestCache::new(FIVE_MINUTES, 100);
        for i in 0..101 {
            cache.insert(format!("key-{}", i), ok(json!(i)), 0);
        }

        assert_eq!(cache.len(), 100);
        assert!(!cache.contains("key-0"));
        assert!(cache.contains("key-1"));
        assert!(cache.contains("key-100"));
    }

    #[test]
    fn test_reads_do_not_refresh_position() {
        let mut cache = RequestCache::new(FIVE_MINUTES, 2);
        cache.insert("a".to_string(), ok(json!(1)), 0);
        cache.insert("b".to_string(), ok(json!(2)), 0);

        assert!(cache.get("a", 1).is_some());
        cache.insert("c".to_string(), ok(json!(3)), 2);

        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
    }

    #[test]
    fn test_overwrite_replaces_and_renews() {
        let mut cache = RequestCache::new(FIVE_MINUTES, 2);
        cache.insert("a".to_string(), ok(json!(1)), 0);
        cache.insert("b".to_string(), ok(json!(2)), 0);
        cache.insert("a".to_string(), ok(json!(10)), 5);
        cache.insert("c".to_string(), ok(json!(3)), 6);

        assert_eq!(cache.get("a", 7), Some(ok(json!(10))));
        assert!(!cache.contains("b"));
    }

    #[test]
    fn test_cleanup_drops_expired() {
        let mut cache = RequestCache::new(Duration::from_millis(100), 10);
        cache.insert("old".to_string(), ok(json!(1)), 0);
        cache.insert("new".to_string(), ok(json!(2)), 50);

        assert_eq!(cache.cleanup(100), 1);
        assert!(!cache.contains("old"));
        assert!(cache.contains("new"));
    }

    #[test]
    fn test_key_includes_method_and_body() {
        let url = "https://backend.spacetechs.net/api/contact";
        let get = cache_key(url, Method::Get, None);
        let post = cache_key(url, Method::Post, Some(&json!({ "name": "Ada" })));

        assert_ne!(get, post);
        assert!(get.starts_with(url));
        assert!(post.contains("\"name\":\"Ada\""));
    }
}
