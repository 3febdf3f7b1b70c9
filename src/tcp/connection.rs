//! Per-connection handler for the binary front.

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::ProxyError;
use crate::protocol::{decode_get_request, encode_error_reply, encode_get_reply, FrameError};
use crate::proxy::CacheProxy;

/// Largest request accepted before a complete frame must have arrived
pub const MAX_REQUEST_SIZE: usize = 64 * 1024;

enum Request {
    Get(String),
    Malformed(String),
    Closed,
}

/// Serves one request on `stream`, then shuts the stream down.
///
/// - A valid `GET` is resolved and answered with a bulk reply (`$-1\r\n`
///   when absent).
/// - A backend failure is answered with an `-ERR` reply.
/// - A malformed request is logged and gets no reply.
pub async fn handle_connection<S>(mut stream: S, proxy: &CacheProxy) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match read_request(&mut stream).await? {
        Request::Get(key) => {
            let reply = match proxy.resolve(&key).await {
                Ok(value) => encode_get_reply(value.as_deref()),
                Err(err) => encode_error_reply(&err.to_string()),
            };
            stream.write_all(&reply).await?;
            stream.flush().await?;
        }
        Request::Malformed(reason) => {
            let err = ProxyError::MalformedRequest(reason);
            warn!(error = %err, "Rejecting request without reply");
        }
        Request::Closed => debug!("Connection closed before sending a request"),
    }

    if let Err(err) = stream.shutdown().await {
        debug!(error = %err, "Shutdown after request failed");
    }
    Ok(())
}

async fn read_request<S>(stream: &mut S) -> io::Result<Request>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(1024);

    loop {
        // The buffer must hold exactly one request frame, nothing after it
        if !buffer.is_empty() {
            match decode_get_request(&buffer) {
                Ok(key) => return Ok(Request::Get(key)),
                Err(FrameError::Incomplete) => {}
                Err(err) => return Ok(Request::Malformed(err.to_string())),
            }
        }

        if buffer.len() >= MAX_REQUEST_SIZE {
            return Ok(Request::Malformed(format!(
                "request exceeds {} bytes",
                MAX_REQUEST_SIZE
            )));
        }

        if stream.read_buf(&mut buffer).await? == 0 {
            return Ok(if buffer.is_empty() {
                Request::Closed
            } else {
                Request::Malformed("connection closed mid-frame".to_string())
            });
        }
    }
}
