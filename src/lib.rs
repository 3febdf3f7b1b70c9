//! Redis Cache - A composable caching proxy for Redis GET lookups
//!
//! Caches backend values in a bounded LRU store whose entries expire once
//! untouched for longer than a staleness threshold. Lookups arrive over HTTP
//! or over the binary RESP protocol; proxies can be stacked.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod protocol;
pub mod proxy;
pub mod tasks;
pub mod tcp;

pub use api::AppState;
pub use backend::{Backend, MemoryBackend, RespClient};
pub use config::{Config, Transport};
pub use error::{ProxyError, Result};
pub use proxy::CacheProxy;
pub use tasks::ExpiryDaemon;
