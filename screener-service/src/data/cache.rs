//! Time-windowed cache for upstream responses.
//!
//! Shields the rate-limited provider from duplicate lookups. Entries live for a
//! fixed TTL; the map is bounded and swept periodically so it cannot grow
//! without limit.
//!
//! Concurrent `get_or_fetch` calls for the same missing key may each run their
//! fetcher. There is no in-flight de-duplication.

use std::collections::HashMap;
use std::future::Future;
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Cache entry with the time it was fetched
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) >= ttl
    }
}

/// Bounded key-value cache with per-entry expiry.
pub struct TtlCache<V> {
    /// Name for logging
    name: &'static str,
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    max_entries: usize,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache holding at most `max_entries` values for `ttl` each.
    pub fn new(name: &'static str, ttl: Duration, max_entries: usize) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Get a live value. Stale entries are never returned.
    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().ok()?;
        let now = Instant::now();

        entries.get(key).and_then(|entry| {
            if entry.is_expired(self.ttl, now) {
                None
            } else {
                Some(entry.value.clone())
            }
        })
    }

    /// Store a value, replacing any previous entry for the key.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        let key = key.into();

        if let Ok(mut entries) = self.entries.write() {
            if !entries.contains_key(&key) && entries.len() >= self.max_entries {
                self.make_room(&mut entries);
            }
            entries.insert(key, CacheEntry::new(value));
        }
    }

    /// Return the live value for `key`, or run `fetcher` and cache its result.
    ///
    /// Failures are handed back to the caller and not cached, so the next
    /// lookup goes to the source again.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetcher: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            debug!(cache = self.name, key = key, "Cache hit");
            return Ok(value);
        }

        debug!(cache = self.name, key = key, "Cache miss");
        let value = fetcher().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn clear_expired(&self) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };

        let before = entries.len();
        let now = Instant::now();
        let ttl = self.ttl;
        entries.retain(|_, entry| !entry.is_expired(ttl, now));
        before - entries.len()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let (total, expired) = self
            .entries
            .read()
            .map(|entries| {
                let expired = entries
                    .values()
                    .filter(|e| e.is_expired(self.ttl, now))
                    .count();
                (entries.len(), expired)
            })
            .unwrap_or((0, 0));

        CacheStats {
            total_entries: total,
            expired_entries: expired,
            active_entries: total - expired,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Free one slot: drop expired entries first, then the oldest one.
    fn make_room(&self, entries: &mut HashMap<String, CacheEntry<V>>) {
        let now = Instant::now();
        let ttl = self.ttl;
        entries.retain(|_, entry| !entry.is_expired(ttl, now));

        if entries.len() < self.max_entries {
            return;
        }

        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.fetched_at)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            debug!(cache = self.name, key = %key, "Evicting oldest entry");
            entries.remove(&key);
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const TTL: Duration = Duration::from_secs(300);

    fn cache() -> TtlCache<f64> {
        TtlCache::new("test", TTL, 16)
    }

    #[test]
    fn test_cache_set_get() {
        let cache = cache();
        cache.insert("quote_AAPL", 187.5);
        assert_eq!(cache.get("quote_AAPL"), Some(187.5));
    }

    #[test]
    fn test_cache_miss() {
        let cache = cache();
        assert!(cache.get("quote_AAPL").is_none());
    }

    #[tokio::test]
    async fn test_get_or_fetch_within_ttl_fetches_once() {
        let cache = cache();
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            let value: Result<f64, String> = cache
                .get_or_fetch("quote_MSFT", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(410.0)
                })
                .await;
            assert_eq!(value, Ok(410.0));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_does_not_cache_errors() {
        let cache = cache();
        let calls = AtomicU32::new(0);

        let first: Result<f64, String> = cache
            .get_or_fetch("quote_MSFT", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("network".to_string())
            })
            .await;
        assert!(first.is_err());

        let second: Result<f64, String> = cache
            .get_or_fetch("quote_MSFT", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(410.0)
            })
            .await;
        assert_eq!(second, Ok(410.0));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_at_ttl() {
        let cache = cache();
        cache.insert("quote_AAPL", 187.5);

        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        assert_eq!(cache.get("quote_AAPL"), Some(187.5));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("quote_AAPL").is_none());

        let calls = AtomicU32::new(0);
        let refreshed: Result<f64, String> = cache
            .get_or_fetch("quote_AAPL", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(190.0)
            })
            .await;
        assert_eq!(refreshed, Ok(190.0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_expired_and_stats() {
        let cache = cache();
        cache.insert("old", 1.0);
        tokio::time::advance(TTL).await;
        cache.insert("fresh", 2.0);

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.expired_entries, 1);
        assert_eq!(stats.active_entries, 1);

        assert_eq!(cache.clear_expired(), 1);
        assert_eq!(cache.stats().total_entries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_oldest() {
        let cache: TtlCache<u32> = TtlCache::new("bounded", TTL, 2);
        cache.insert("a", 1);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.insert("b", 2);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.insert("c", 3);

        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.stats().total_entries, 2);
    }

    #[test]
    fn test_replacing_key_does_not_evict() {
        let cache: TtlCache<u32> = TtlCache::new("bounded", TTL, 2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("b", 3);

        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), Some(3));
    }
}
