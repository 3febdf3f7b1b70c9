//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with touch-on-read support.

use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single cached backend value with its freshness timestamp.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached value, opaque to the cache
    pub value: String,
    /// Monotonic time of creation or of the last successful read
    pub last_touched: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry touched at `now`.
    pub fn new(value: String, now: Instant) -> Self {
        Self {
            value,
            last_touched: now,
        }
    }

    // == Touch ==
    /// Refreshes the entry's freshness timestamp.
    ///
    /// The timestamp only ever advances; an earlier `now` is ignored.
    pub fn touch(&mut self, now: Instant) {
        if now > self.last_touched {
            self.last_touched = now;
        }
    }

    /// Whether the entry qualifies for removal by a sweep with this cutoff.
    ///
    /// Boundary condition: an entry touched exactly at the cutoff is expired.
    pub fn is_expired_at(&self, cutoff: Instant) -> bool {
        self.last_touched <= cutoff
    }
}
