//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.
//! Invalid values are never fatal: they are logged and replaced by defaults.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

// == Defaults ==
const DEFAULT_BACKEND_ADDR: &str = "redis-backend:6379";
const DEFAULT_EXPIRY_TIME_MS: u64 = 5000;
const DEFAULT_CACHE_SIZE: usize = 100;
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_SWEEP_INTERVAL_MS: u64 = 100;

/// Transport the proxy listens with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// Textual HTTP interface (`GET /ping`, `GET /:key`)
    #[default]
    Http,
    /// Binary RESP request/response, one request per connection
    Tcp,
}

impl FromStr for Transport {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("http") {
            Ok(Transport::Http)
        } else if s.eq_ignore_ascii_case("tcp") {
            Ok(Transport::Tcp)
        } else {
            Err(())
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Http => f.write_str("http"),
            Transport::Tcp => f.write_str("tcp"),
        }
    }
}

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address of the downstream Redis (which might be another caching proxy)
    pub backend_addr: String,
    /// How long an untouched value stays cached, in milliseconds
    pub expiry_time_ms: u64,
    /// Maximum number of values to cache
    pub cache_size: usize,
    /// Port the proxy listens on
    pub port: u16,
    /// Listening transport
    pub transport: Transport,
    /// Pause between expiry sweeps, in milliseconds
    pub sweep_interval_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS` - Backend address (default: redis-backend:6379)
    /// - `EXPIRY_TIME` - Staleness threshold in milliseconds (default: 5000)
    /// - `CACHE_SIZE` - Number of values to cache (default: 100)
    /// - `PORT` - Listening port (default: 5000)
    /// - `TYPE` - `http` or `tcp` (default: http)
    /// - `SWEEP_INTERVAL` - Expiry sweep interval in milliseconds (default: 100)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Creates a new Config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_addr = match lookup("REDIS") {
            Some(addr) if !addr.trim().is_empty() => addr.trim().to_string(),
            other => {
                warn!(
                    "Invalid REDIS: '{}', setting to '{}'",
                    other.unwrap_or_default(),
                    DEFAULT_BACKEND_ADDR
                );
                DEFAULT_BACKEND_ADDR.to_string()
            }
        };

        Self {
            backend_addr,
            expiry_time_ms: parse_or_default(&lookup, "EXPIRY_TIME", DEFAULT_EXPIRY_TIME_MS, |_| {
                true
            }),
            cache_size: parse_or_default(&lookup, "CACHE_SIZE", DEFAULT_CACHE_SIZE, |v| *v > 0),
            port: parse_or_default(&lookup, "PORT", DEFAULT_PORT, |_| true),
            transport: parse_or_default(&lookup, "TYPE", Transport::default(), |_| true),
            sweep_interval_ms: parse_or_default(
                &lookup,
                "SWEEP_INTERVAL",
                DEFAULT_SWEEP_INTERVAL_MS,
                |v| *v > 0,
            ),
        }
    }

    /// Staleness threshold as a Duration.
    pub fn expiry_time(&self) -> Duration {
        Duration::from_millis(self.expiry_time_ms)
    }

    /// Sweep interval as a Duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

fn parse_or_default<F, T, V>(lookup: &F, name: &str, default: T, valid: V) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + fmt::Display,
    V: Fn(&T) -> bool,
{
    let raw = lookup(name).unwrap_or_default();
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            warn!("Invalid {}: '{}', setting to {}", name, raw, default);
            default
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_addr: DEFAULT_BACKEND_ADDR.to_string(),
            expiry_time_ms: DEFAULT_EXPIRY_TIME_MS,
            cache_size: DEFAULT_CACHE_SIZE,
            port: DEFAULT_PORT,
            transport: Transport::Http,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
        }
    }
}
