//! Backend Module
//!
//! The downstream key-value service the proxy fronts. It may be a Redis
//! master or another instance of this proxy.

mod client;
mod memory;

use async_trait::async_trait;

use crate::error::Result;

pub use client::{RespClient, CONNECT_TIMEOUT};
pub use memory::MemoryBackend;

/// Operations the proxy needs from its backend.
///
/// Absence is `Ok(None)`; transport and protocol failures are errors and
/// must never be reported as absence.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Liveness check, returning the backend's liveness payload.
    async fn ping(&self) -> Result<String>;

    /// Looks a key up.
    async fn get(&self, key: &str) -> Result<Option<String>>;
}
