//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and
//! touch-on-read freshness timestamps.
//!
//! The store itself is not synchronized. It is shared as
//! `Arc<RwLock<CacheStore>>`; every method taking `&mut self` (touching
//! reads, inserts, sweeps) therefore runs under the exclusive lock, which keeps
//! the recency order and the timestamp order identical.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::cache::{CacheEntry, CacheStats, LruTracker};

// == Cache Store ==
/// Bounded cache storage with LRU eviction and touch-on-read.
///
/// Invariant: walking keys from least to most recently used yields
/// non-decreasing `last_touched` timestamps.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Eviction and expiry counters
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            capacity: capacity.max(1),
        }
    }

    /// Timestamp for a touch or insert, never older than the newest entry.
    fn now(&self) -> Instant {
        let now = Instant::now();
        self.lru
            .peek_newest()
            .and_then(|key| self.entries.get(key))
            .map_or(now, |newest| now.max(newest.last_touched))
    }

    // == Get ==
    /// Retrieves a value by key, touching it on a hit.
    ///
    /// A hit moves the entry to the most recently used position and resets
    /// its freshness timestamp.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let now = self.now();
        let entry = self.entries.get_mut(key)?;
        entry.touch(now);
        let value = entry.value.clone();
        self.lru.touch(key);
        Some(value)
    }

    // == Peek ==
    /// Looks at an entry without touching it.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    // == Put ==
    /// Stores a value, placing it at the most recently used position.
    ///
    /// If the key already exists, the value is overwritten and its timestamp
    /// refreshed. If the key is new and the cache is at capacity, the least
    /// recently used entry is evicted first.
    pub fn put(&mut self, key: String, value: String) {
        let now = self.now();

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
            entry.touch(now);
        } else {
            if self.entries.len() >= self.capacity {
                if let Some(evicted) = self.lru.evict_oldest() {
                    trace!(key = %evicted, "evicting least recently used entry");
                    self.entries.remove(&evicted);
                    self.stats.record_eviction();
                }
            }
            self.entries.insert(key.clone(), CacheEntry::new(value, now));
        }

        self.lru.touch(&key);
    }

    // == Remove ==
    /// Removes an entry by key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        Some(entry.value)
    }

    // == Purge ==
    /// Drops every entry.
    pub fn purge(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    // == Expire ==
    /// Removes entries untouched for at least `threshold`.
    ///
    /// Returns the number of entries removed.
    pub fn expire(&mut self, threshold: Duration) -> usize {
        match Instant::now().checked_sub(threshold) {
            Some(cutoff) => self.expire_before(cutoff),
            None => 0,
        }
    }

    /// Removes entries whose `last_touched` is at or before `cutoff`.
    ///
    /// Walks from the least recently used end and stops at the first fresh
    /// entry: every entry after it is at least as fresh. Cost is proportional
    /// to the number of entries removed.
    pub fn expire_before(&mut self, cutoff: Instant) -> usize {
        let mut removed = 0;

        loop {
            let expired = match self.lru.peek_oldest() {
                Some(oldest) => self
                    .entries
                    .get(oldest)
                    .map_or(true, |entry| entry.is_expired_at(cutoff)),
                None => break,
            };
            if !expired {
                break;
            }
            if let Some(key) = self.lru.evict_oldest() {
                trace!(key = %key, "expiring stale entry");
                self.entries.remove(&key);
                removed += 1;
            }
        }

        self.stats.record_expirations(removed);
        removed
    }

    // == Keys ==
    /// Returns keys ordered from least to most recently used.
    pub fn keys(&self) -> Vec<String> {
        self.lru.iter().map(str::to_string).collect()
    }

    // == Contains ==
    /// Whether the key is cached. Does not touch.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Stats ==
    /// Returns current eviction/expiry statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Capacity ==
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn filled(capacity: usize, keys: &[&str]) -> CacheStore {
        let mut store = CacheStore::new(capacity);
        for key in keys {
            store.put(key.to_string(), format!("value-{}", key));
        }
        store
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 100);
    }

    #[test]
    fn test_store_zero_capacity_holds_one() {
        let mut store = CacheStore::new(0);
        store.put("a".to_string(), "1".to_string());
        store.put("b".to_string(), "2".to_string());

        assert_eq!(store.capacity(), 1);
        assert_eq!(store.keys(), vec!["b"]);
    }

    #[test]
    fn test_store_put_and_get() {
        let mut store = CacheStore::new(100);

        store.put("key1".to_string(), "value1".to_string());

        assert_eq!(store.get("key1"), Some("value1".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = CacheStore::new(100);
        assert_eq!(store.get("nonexistent"), None);
    }

    #[test]
    fn test_store_remove() {
        let mut store = filled(100, &["key1"]);

        assert_eq!(store.remove("key1"), Some("value-key1".to_string()));
        assert_eq!(store.remove("key1"), None);
        assert!(store.is_empty());
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = filled(100, &["key1", "key2"]);

        store.put("key1".to_string(), "value2".to_string());

        assert_eq!(store.len(), 2);
        assert_eq!(store.keys(), vec!["key2", "key1"]);
        assert_eq!(store.get("key1"), Some("value2".to_string()));
    }

    #[test]
    fn test_store_lru_eviction() {
        let mut store = filled(3, &["key1", "key2", "key3"]);

        // Cache is full, adding key4 should evict key1 (oldest)
        store.put("key4".to_string(), "value4".to_string());

        assert_eq!(store.len(), 3);
        assert!(!store.contains("key1"));
        assert_eq!(store.keys(), vec!["key2", "key3", "key4"]);
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_overwrite_at_capacity_does_not_evict() {
        let mut store = filled(2, &["a", "b"]);

        store.put("a".to_string(), "new".to_string());

        assert_eq!(store.keys(), vec!["b", "a"]);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let mut store = filled(3, &["key1", "key2", "key3"]);

        // Access key1 to make it most recently used
        store.get("key1").unwrap();

        // Adding key4 should evict key2 (now oldest)
        store.put("key4".to_string(), "value4".to_string());

        assert!(store.contains("key1"));
        assert!(!store.contains("key2"));
    }

    #[test]
    fn test_store_purge() {
        let mut store = filled(10, &["a", "b", "c"]);

        store.purge();

        assert!(store.is_empty());
        assert!(store.keys().is_empty());
        store.put("d".to_string(), "4".to_string());
        assert_eq!(store.keys(), vec!["d"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_get_refreshes_timestamp() {
        let mut store = filled(10, &["a"]);
        let created = store.peek("a").unwrap().last_touched;

        advance(Duration::from_millis(250)).await;
        store.get("a");

        let touched = store.peek("a").unwrap().last_touched;
        assert_eq!(touched - created, Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_expire_removes_stale_prefix() {
        let mut store = CacheStore::new(10);

        store.put("old".to_string(), "1".to_string());
        advance(Duration::from_millis(100)).await;
        store.put("mid".to_string(), "2".to_string());
        advance(Duration::from_millis(100)).await;
        store.put("new".to_string(), "3".to_string());
        advance(Duration::from_millis(50)).await;

        // Threshold 150ms: "old" (250ms) and "mid" (150ms) qualify
        let removed = store.expire(Duration::from_millis(150));

        assert_eq!(removed, 2);
        assert_eq!(store.keys(), vec!["new"]);
        assert_eq!(store.stats().expirations, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_touched_entry_survives_sweep() {
        let mut store = filled(10, &["a", "b"]);

        advance(Duration::from_millis(400)).await;
        store.get("a");
        advance(Duration::from_millis(200)).await;

        // Both were created 600ms ago; only "a" was touched since
        let removed = store.expire(Duration::from_millis(500));

        assert_eq!(removed, 1);
        assert_eq!(store.keys(), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_expire_nothing_fresh() {
        let mut store = filled(10, &["a", "b", "c"]);

        advance(Duration::from_millis(10)).await;

        assert_eq!(store.expire(Duration::from_secs(5)), 0);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_store_expire_before_boundary() {
        let mut store = filled(10, &["a", "b", "c"]);
        let cutoff = store.peek("b").unwrap().last_touched;

        let removed = store.expire_before(cutoff);

        // Entries touched at or before the cutoff go
        assert!(removed >= 2);
        assert!(!store.contains("a"));
        assert!(!store.contains("b"));
    }

    #[test]
    fn test_store_timestamps_follow_recency_order() {
        let mut store = filled(10, &["a", "b", "c", "d"]);
        store.get("b");
        store.get("a");
        store.put("e".to_string(), "5".to_string());

        let stamps: Vec<Instant> = store
            .keys()
            .iter()
            .map(|key| store.peek(key).unwrap().last_touched)
            .collect();

        assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(store.keys(), vec!["c", "d", "b", "a", "e"]);
    }
}
