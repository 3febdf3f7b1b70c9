//! Caching Proxy Service
//!
//! `CacheProxy` owns everything the fronts share: the cache store, the
//! backend handle, the hit/miss counters and the expiry daemon slot. It is
//! built once at startup and handed to the fronts behind an `Arc`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{error, trace};

use crate::backend::Backend;
use crate::cache::{CacheStats, CacheStore};
use crate::config::Config;
use crate::error::Result;
use crate::tasks::ExpiryDaemon;

/// Read-only caching layer in front of a backend.
pub struct CacheProxy {
    /// Shared cache, also swept by the expiry daemon
    cache: Arc<RwLock<CacheStore>>,
    /// Downstream key-value service
    backend: Arc<dyn Backend>,
    /// Lookups answered from the cache (advisory)
    hits: AtomicU64,
    /// Lookups delegated to the backend (advisory)
    misses: AtomicU64,
    /// Running expiry sweep, if any
    expiry: Mutex<Option<ExpiryDaemon>>,
}

impl CacheProxy {
    // == Constructor ==
    /// Creates a proxy caching at most `capacity` values from `backend`.
    pub fn new(backend: Arc<dyn Backend>, capacity: usize) -> Self {
        Self {
            cache: Arc::new(RwLock::new(CacheStore::new(capacity))),
            backend,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expiry: Mutex::new(None),
        }
    }

    /// Creates a proxy sized from configuration. The expiry daemon is not
    /// started; see [`CacheProxy::start_expiry`].
    pub fn from_config(backend: Arc<dyn Backend>, config: &Config) -> Self {
        Self::new(backend, config.cache_size)
    }

    // == Resolve ==
    /// Resolves a key through the cache, falling back to the backend.
    ///
    /// - Cache hit: the entry is touched and its value returned.
    /// - Miss with a value on the backend: the value is cached and returned.
    /// - Miss with the key absent on the backend: `Ok(None)`, nothing cached.
    /// - Backend failure: the error is returned, never reported as absence.
    pub async fn resolve(&self, key: &str) -> Result<Option<String>> {
        let cached = self.cache.write().await.get(key);
        if let Some(value) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key, "cache hit");
            return Ok(Some(value));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(key, "cache miss");

        let fetched = self.backend.get(key).await.map_err(|err| {
            error!(key, error = %err, "Backend lookup failed");
            err
        })?;

        if let Some(value) = &fetched {
            self.cache
                .write()
                .await
                .put(key.to_string(), value.clone());
        }
        Ok(fetched)
    }

    // == Ping ==
    /// Passes a liveness check through to the backend.
    pub async fn ping(&self) -> Result<String> {
        self.backend.ping().await
    }

    // == Expiry ==
    /// Starts the expiry sweep, stopping any sweep already running first.
    pub fn start_expiry(&self, threshold: Duration, interval: Duration) {
        let mut slot = self.expiry.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.stop();
        }
        *slot = Some(ExpiryDaemon::start(self.cache.clone(), threshold, interval));
    }

    /// Stops the expiry sweep. A no-op when none is running.
    pub fn stop_expiry(&self) {
        let current = self
            .expiry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(daemon) = current {
            daemon.stop();
        }
    }

    /// Stops the expiry sweep and waits for it to exit.
    pub async fn shutdown(&self) {
        let current = self
            .expiry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(daemon) = current {
            daemon.shutdown().await;
        }
    }

    /// Whether an expiry sweep is running.
    pub fn expiry_running(&self) -> bool {
        self.expiry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(ExpiryDaemon::is_running)
    }

    // == Administration ==
    /// Shared cache handle, for diagnostics and tests.
    pub fn cache(&self) -> &Arc<RwLock<CacheStore>> {
        &self.cache
    }

    /// Drops every cached entry.
    pub async fn purge(&self) {
        self.cache.write().await.purge();
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    // == Stats ==
    /// Snapshot of cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let mut stats = self.cache.read().await.stats();
        stats.hits = self.hits.load(Ordering::Relaxed);
        stats.misses = self.misses.load(Ordering::Relaxed);
        stats
    }

    /// Zeroes the hit and miss counters.
    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::error::ProxyError;

    fn proxy_with(values: &[(&str, &str)], capacity: usize) -> (CacheProxy, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::with_values(values.iter().copied()));
        (CacheProxy::new(backend.clone(), capacity), backend)
    }

    #[tokio::test]
    async fn test_resolve_miss_then_hit() {
        let (proxy, backend) = proxy_with(&[("key1", "value1")], 10);

        assert_eq!(proxy.resolve("key1").await.unwrap(), Some("value1".to_string()));
        assert_eq!(proxy.resolve("key1").await.unwrap(), Some("value1".to_string()));

        let stats = proxy.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(backend.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_absent_key_is_not_cached() {
        let (proxy, backend) = proxy_with(&[], 10);

        assert_eq!(proxy.resolve("nope").await.unwrap(), None);
        assert_eq!(proxy.resolve("nope").await.unwrap(), None);

        assert!(proxy.is_empty().await);
        assert_eq!(backend.get_calls(), 2);
        assert_eq!(proxy.stats().await.misses, 2);
    }

    #[tokio::test]
    async fn test_backend_error_is_not_absence() {
        let (proxy, backend) = proxy_with(&[("k", "v")], 10);
        backend.set_unavailable(true);

        let result = proxy.resolve("k").await;

        assert!(matches!(result, Err(ProxyError::BackendUnavailable(_))));
        assert!(proxy.is_empty().await);
    }

    #[tokio::test]
    async fn test_cached_value_served_while_backend_down() {
        let (proxy, backend) = proxy_with(&[("k", "v")], 10);
        proxy.resolve("k").await.unwrap();

        backend.set_unavailable(true);

        assert_eq!(proxy.resolve("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_reset_stats_and_purge() {
        let (proxy, _backend) = proxy_with(&[("k", "v")], 10);
        proxy.resolve("k").await.unwrap();
        proxy.resolve("k").await.unwrap();

        proxy.reset_stats();
        proxy.purge().await;

        let stats = proxy.stats().await;
        assert_eq!((stats.hits, stats.misses, stats.total_entries), (0, 0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarting_expiry_replaces_daemon() {
        let (proxy, _backend) = proxy_with(&[("k", "v")], 10);

        proxy.start_expiry(Duration::from_secs(60), Duration::from_millis(10));
        proxy.start_expiry(Duration::from_millis(100), Duration::from_millis(10));
        assert!(proxy.expiry_running());

        proxy.resolve("k").await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(proxy.is_empty().await, "Second daemon's threshold applies");

        proxy.stop_expiry();
        proxy.stop_expiry();
        assert!(!proxy.expiry_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarting_expiry_stops_previous_sweep() {
        let (proxy, _backend) = proxy_with(&[("k", "v")], 10);

        proxy.start_expiry(Duration::from_millis(100), Duration::from_millis(10));
        proxy.start_expiry(Duration::from_secs(60), Duration::from_millis(10));

        proxy.resolve("k").await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(proxy.len().await, 1, "First daemon must no longer sweep");

        proxy.shutdown().await;
    }

    #[tokio::test]
    async fn test_cached_value_outlives_backend_removal() {
        let (proxy, backend) = proxy_with(&[("k", "v")], 10);
        proxy.resolve("k").await.unwrap();

        assert_eq!(backend.remove("k"), Some("v".to_string()));

        assert_eq!(proxy.resolve("k").await.unwrap(), Some("v".to_string()));
        proxy.purge().await;
        assert_eq!(proxy.resolve("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ping_passthrough() {
        let (proxy, backend) = proxy_with(&[], 10);
        assert_eq!(proxy.ping().await.unwrap(), "PONG");

        backend.set_unavailable(true);
        assert!(proxy.ping().await.is_err());
    }
}
