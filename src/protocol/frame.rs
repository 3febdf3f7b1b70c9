//! RESP Frame Module
//!
//! Incremental parser and encoder for the Redis serialization protocol
//! (RESP2) frames spoken by the backend and by the TCP front.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Segment terminator
pub const CRLF: &[u8] = b"\r\n";

/// Largest bulk string accepted, as in Redis (512 MB)
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Deepest array nesting accepted
pub const MAX_DEPTH: usize = 32;

// == Frame ==
/// A single RESP2 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `+OK\r\n`
    Simple(String),
    /// `-ERR message\r\n`
    Error(String),
    /// `:42\r\n`
    Integer(i64),
    /// `$5\r\nhello\r\n`
    Bulk(Bytes),
    /// `$-1\r\n` (also produced for the null array `*-1\r\n`)
    Null,
    /// `*2\r\n...`
    Array(Vec<Frame>),
}

// == Frame Error ==
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// More bytes are needed before the frame can be parsed
    #[error("incomplete frame")]
    Incomplete,

    /// The bytes do not follow the RESP grammar
    #[error("invalid frame: {0}")]
    Invalid(String),
}

impl Frame {
    // == Constructors ==
    /// Bulk string frame from text.
    pub fn bulk(text: &str) -> Self {
        Frame::Bulk(Bytes::copy_from_slice(text.as_bytes()))
    }

    // == Parse ==
    /// Parses one frame from the front of `src`.
    ///
    /// Returns the frame and the number of bytes it occupied. Returns
    /// `FrameError::Incomplete` when `src` holds only a prefix of a frame.
    pub fn parse(src: &[u8]) -> Result<(Frame, usize), FrameError> {
        let mut cursor = Cursor { src, pos: 0 };
        let frame = cursor.frame(0)?;
        Ok((frame, cursor.pos))
    }

    // == Encode ==
    /// Appends the wire form of this frame to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Frame::Simple(text) => write_line(dst, b'+', text.as_bytes()),
            Frame::Error(text) => write_line(dst, b'-', text.as_bytes()),
            Frame::Integer(n) => write_line(dst, b':', n.to_string().as_bytes()),
            Frame::Bulk(data) => {
                write_line(dst, b'$', data.len().to_string().as_bytes());
                dst.put_slice(data);
                dst.put_slice(CRLF);
            }
            Frame::Null => dst.put_slice(b"$-1\r\n"),
            Frame::Array(items) => {
                write_line(dst, b'*', items.len().to_string().as_bytes());
                for item in items {
                    item.encode(dst);
                }
            }
        }
    }

    /// Wire form of this frame.
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::new();
        self.encode(&mut dst);
        dst.freeze()
    }
}

fn write_line(dst: &mut BytesMut, prefix: u8, body: &[u8]) {
    dst.put_u8(prefix);
    dst.put_slice(body);
    dst.put_slice(CRLF);
}

// == Cursor ==
struct Cursor<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn frame(&mut self, depth: usize) -> Result<Frame, FrameError> {
        if depth > MAX_DEPTH {
            return Err(FrameError::Invalid("arrays nested too deeply".to_string()));
        }

        match self.byte()? {
            b'+' => Ok(Frame::Simple(self.text_line()?)),
            b'-' => Ok(Frame::Error(self.text_line()?)),
            b':' => Ok(Frame::Integer(self.decimal()?)),
            b'$' => match self.decimal()? {
                -1 => Ok(Frame::Null),
                len if len < 0 => Err(invalid(format!("bulk length {}", len))),
                len => {
                    let len = len as usize;
                    if len > MAX_BULK_LEN {
                        return Err(invalid(format!("bulk length {} exceeds limit", len)));
                    }
                    let data = self.take(len)?;
                    if self.take(CRLF.len())? != CRLF {
                        return Err(invalid("bulk string not terminated by CRLF"));
                    }
                    Ok(Frame::Bulk(Bytes::copy_from_slice(data)))
                }
            },
            b'*' => match self.decimal()? {
                -1 => Ok(Frame::Null),
                len if len < 0 => Err(invalid(format!("array length {}", len))),
                len => {
                    let mut items = Vec::with_capacity((len as usize).min(16));
                    for _ in 0..len {
                        items.push(self.frame(depth + 1)?);
                    }
                    Ok(Frame::Array(items))
                }
            },
            other => Err(invalid(format!("unknown frame type byte {:#04x}", other))),
        }
    }

    fn byte(&mut self) -> Result<u8, FrameError> {
        let byte = *self.src.get(self.pos).ok_or(FrameError::Incomplete)?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], FrameError> {
        let end = self.pos.checked_add(len).ok_or(FrameError::Incomplete)?;
        let src: &'a [u8] = self.src;
        let data = src.get(self.pos..end).ok_or(FrameError::Incomplete)?;
        self.pos = end;
        Ok(data)
    }

    /// Bytes up to the next CRLF, consuming the terminator.
    fn line(&mut self) -> Result<&'a [u8], FrameError> {
        let src: &'a [u8] = self.src;
        let rest = &src[self.pos..];
        let end = rest
            .windows(2)
            .position(|window| window == CRLF)
            .ok_or_else(|| {
                if rest.contains(&b'\n') && !rest.ends_with(b"\r") {
                    invalid("line feed without carriage return")
                } else {
                    FrameError::Incomplete
                }
            })?;
        self.pos += end + CRLF.len();
        Ok(&rest[..end])
    }

    fn text_line(&mut self) -> Result<String, FrameError> {
        let line = self.line()?;
        String::from_utf8(line.to_vec()).map_err(|_| invalid("line is not UTF-8"))
    }

    fn decimal(&mut self) -> Result<i64, FrameError> {
        let line = self.line()?;
        std::str::from_utf8(line)
            .ok()
            .and_then(|text| text.parse::<i64>().ok())
            .ok_or_else(|| {
                invalid(format!(
                    "expected integer, got {:?}",
                    String::from_utf8_lossy(line)
                ))
            })
    }
}

fn invalid(reason: impl Into<String>) -> FrameError {
    FrameError::Invalid(reason.into())
}
