//! Cache Module
//!
//! Provides the bounded, LRU-ordered, touch-on-read cache behind the proxy.

mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::CacheStore;
