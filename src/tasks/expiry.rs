//! Expiry Sweep Task
//!
//! Background task that periodically removes stale cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Handle to a running expiry sweep.
///
/// Each handle owns its own cancellation token, so stopping one daemon can
/// never signal another. Dropping the handle stops the daemon too.
#[derive(Debug)]
pub struct ExpiryDaemon {
    /// Cancels the sweep loop when dropped
    guard: DropGuard,
    /// Token observed by the sweep loop
    token: CancellationToken,
    /// The spawned sweep loop
    handle: JoinHandle<()>,
}

impl ExpiryDaemon {
    /// Spawns a task that, every `interval`, removes entries untouched for at
    /// least `threshold`.
    ///
    /// Each sweep holds the cache's write lock for its duration.
    ///
    /// # Example
    /// ```ignore
    /// let cache = Arc::new(RwLock::new(CacheStore::new(100)));
    /// let daemon = ExpiryDaemon::start(cache.clone(), Duration::from_secs(5), Duration::from_millis(100));
    /// // Later, during shutdown:
    /// daemon.shutdown().await;
    /// ```
    pub fn start(cache: Arc<RwLock<CacheStore>>, threshold: Duration, interval: Duration) -> Self {
        let token = CancellationToken::new();
        let loop_token = token.clone();

        let handle = tokio::spawn(async move {
            info!(
                "Starting expiry sweep: threshold {:?}, interval {:?}",
                threshold, interval
            );

            loop {
                tokio::select! {
                    _ = loop_token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }

                let (removed, remaining) = {
                    let mut cache_guard = cache.write().await;
                    let removed = cache_guard.expire(threshold);
                    (removed, cache_guard.len())
                };

                if removed > 0 {
                    info!(
                        "Expiry sweep: removed {} stale entries, {} remaining",
                        removed, remaining
                    );
                } else {
                    debug!("Expiry sweep: no stale entries found");
                }
            }

            info!("Expiry sweep stopped");
        });

        Self {
            guard: token.clone().drop_guard(),
            token,
            handle,
        }
    }

    /// Signals the sweep loop to exit at its next wake-up.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Stops the sweep loop and waits for it to exit.
    pub async fn shutdown(self) {
        let Self { guard, handle, .. } = self;
        drop(guard);
        let _ = handle.await;
    }

    /// Whether the sweep loop is still running.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}
