//! Accept loop for the binary front.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info, info_span, warn, Instrument};

use super::connection::handle_connection;
use crate::proxy::CacheProxy;

/// Binds the binary front on all interfaces.
pub async fn bind(port: u16) -> io::Result<TcpListener> {
    TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await
}

/// Accepts connections forever, serving each on its own task.
///
/// Accept failures (e.g. file descriptor exhaustion) are logged and retried
/// after a short pause.
pub async fn serve(listener: TcpListener, proxy: Arc<CacheProxy>) -> io::Result<()> {
    info!(
        "Caching TCP redis proxy now listening on {}",
        listener.local_addr()?
    );

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                error!(error = %err, "Could not accept connection");
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let proxy = proxy.clone();
        tokio::spawn(
            async move {
                if let Err(err) = handle_connection(stream, &proxy).await {
                    warn!(error = %err, "Connection failed");
                }
            }
            .instrument(info_span!("tcp_connection", %peer)),
        );
    }
}
