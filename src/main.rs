//! Redis Cache - A composable caching proxy for Redis GET lookups
//!
//! Environment: `REDIS`, `EXPIRY_TIME`, `CACHE_SIZE`, `PORT`, `TYPE`,
//! `SWEEP_INTERVAL` (see `Config::from_env`).

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use redis_cache::api::create_router;
use redis_cache::backend::{Backend, RespClient};
use redis_cache::{tcp, AppState, CacheProxy, Config, Transport};

/// Main entry point for the caching proxy.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect to the backend and check it answers PING
/// 4. Create the proxy and start the expiry sweep
/// 5. Serve HTTP or TCP on the configured port
/// 6. Stop the sweep on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redis_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Caching redis: {}, expiry={}ms, cache size={}, port={}, type={}, sweep interval={}ms",
        config.backend_addr,
        config.expiry_time_ms,
        config.cache_size,
        config.port,
        config.transport,
        config.sweep_interval_ms
    );

    // A proxy cannot serve without its backend
    let backend = RespClient::connect(config.backend_addr.clone())
        .await
        .with_context(|| format!("Error on 'redis' connection to '{}'", config.backend_addr))?;
    let pong = backend
        .ping()
        .await
        .with_context(|| format!("Backend '{}' did not answer PING", config.backend_addr))?;
    info!("Backend {} answered {}", config.backend_addr, pong);

    let proxy = Arc::new(CacheProxy::from_config(Arc::new(backend), &config));
    proxy.start_expiry(config.expiry_time(), config.sweep_interval());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    match config.transport {
        Transport::Http => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Could not bind HTTP listener on {}", addr))?;
            info!("Caching HTTP redis proxy now listening on http://{}", addr);

            axum::serve(listener, create_router(AppState::new(proxy.clone())))
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("HTTP server failed")?;
        }
        Transport::Tcp => {
            let listener = tcp::bind(config.port)
                .await
                .with_context(|| format!("Could not open 'tcp' listener on {}", addr))?;

            tokio::select! {
                served = tcp::serve(listener, proxy.clone()) => {
                    served.context("TCP listener failed")?;
                }
                _ = shutdown_signal() => {}
            }
        }
    }

    proxy.shutdown().await;
    let stats = proxy.stats().await;
    info!(
        "Proxy shutdown complete: {} hits, {} misses (hit rate {:.1}%), {} evictions, {} expirations",
        stats.hits,
        stats.misses,
        stats.hit_rate() * 100.0,
        stats.evictions,
        stats.expirations
    );
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
