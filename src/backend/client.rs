//! RESP Backend Client
//!
//! Talks RESP to the backend over TCP. A single connection is kept open
//! between calls; when a reused connection turns out to be dead (a stacked
//! proxy closes every connection after one reply) the call is retried once on
//! a fresh connection.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

use crate::backend::Backend;
use crate::error::{ProxyError, Result};
use crate::protocol::{
    encode_command, encode_get_request, frame_kind, get_value_from_frame, Frame, FrameError,
};

/// How long establishing a backend connection may take
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// == RESP Client ==
/// Backend client speaking RESP over TCP.
#[derive(Debug)]
pub struct RespClient {
    /// Backend address, `host:port`
    addr: String,
    /// Open connection, if any
    conn: Mutex<Option<Connection>>,
}

impl RespClient {
    // == Constructor ==
    /// Connects to the backend at `addr`.
    ///
    /// Fails if no connection can be established within `CONNECT_TIMEOUT`.
    pub async fn connect(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        let conn = Connection::open(&addr).await?;
        Ok(Self {
            addr,
            conn: Mutex::new(Some(conn)),
        })
    }

    // == Set ==
    /// Stores a value on the backend, optionally expiring after `expire`
    /// (whole seconds, at least one).
    pub async fn set(&self, key: &str, value: &str, expire: Option<Duration>) -> Result<()> {
        let seconds = expire.map(|ttl| ttl.as_secs().max(1).to_string());
        let mut args = vec!["SET", key, value];
        if let Some(seconds) = &seconds {
            args.extend(["EX", seconds.as_str()]);
        }

        match self.call(encode_command(&args)).await? {
            Frame::Simple(status) if status == "OK" => Ok(()),
            Frame::Error(message) => Err(ProxyError::BackendReply(message)),
            other => Err(unexpected("SET", &other)),
        }
    }

    // == Round Trip ==
    /// Sends one request and reads one reply frame.
    async fn call(&self, request: Bytes) -> Result<Frame> {
        let mut guard = self.conn.lock().await;

        if let Some(conn) = guard.as_mut() {
            match conn.call(&request).await {
                Ok(frame) => return Ok(frame),
                Err(ProxyError::BackendUnavailable(err)) => {
                    debug!(addr = %self.addr, error = %err, "backend connection lost, reconnecting");
                    *guard = None;
                }
                Err(err) => {
                    // Stream position is unknown after a bad frame
                    *guard = None;
                    return Err(err);
                }
            }
        }

        let mut conn = Connection::open(&self.addr).await?;
        let frame = conn.call(&request).await?;
        *guard = Some(conn);
        Ok(frame)
    }
}

#[async_trait]
impl Backend for RespClient {
    async fn ping(&self) -> Result<String> {
        match self.call(encode_command(&["PING"])).await? {
            Frame::Simple(payload) => Ok(payload),
            Frame::Bulk(payload) => String::from_utf8(payload.to_vec())
                .map_err(|_| ProxyError::BackendProtocol("PING reply is not UTF-8".to_string())),
            Frame::Error(message) => Err(ProxyError::BackendReply(message)),
            other => Err(unexpected("PING", &other)),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.call(encode_get_request(key)).await? {
            Frame::Error(message) => Err(ProxyError::BackendReply(message)),
            frame => get_value_from_frame(frame).map_err(ProxyError::from_backend_frame),
        }
    }
}

fn unexpected(command: &str, frame: &Frame) -> ProxyError {
    ProxyError::BackendProtocol(format!(
        "unexpected {} reply to {}",
        frame_kind(frame),
        command
    ))
}

// == Connection ==
#[derive(Debug)]
struct Connection {
    stream: BufWriter<TcpStream>,
    buffer: BytesMut,
}

impl Connection {
    async fn open(addr: &str) -> Result<Self> {
        let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connecting to {} timed out", addr),
                )
            })??;
        stream.set_nodelay(true)?;

        Ok(Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(4 * 1024),
        })
    }

    async fn call(&mut self, request: &[u8]) -> Result<Frame> {
        self.stream.write_all(request).await?;
        self.stream.flush().await?;
        self.read_frame().await
    }

    async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            match Frame::parse(&self.buffer) {
                Ok((frame, used)) => {
                    self.buffer.advance(used);
                    return Ok(frame);
                }
                Err(FrameError::Incomplete) => {}
                Err(err) => return Err(ProxyError::from_backend_frame(err)),
            }

            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "backend closed the connection",
                )
                .into());
            }
        }
    }
}
