//! GET Codec Module
//!
//! Wraps and unwraps the RESP messages of a single GET round trip:
//! `*2\r\n$3\r\nGET\r\n$<n>\r\n<key>\r\n` one way, a bulk reply the other.
//! A missing value travels as the null bulk string `$-1\r\n`, which stays
//! distinguishable from an empty value `$0\r\n\r\n`.

use bytes::{Bytes, BytesMut};

use crate::protocol::{Frame, FrameError};

/// Retrieval command name
pub const GET_COMMAND: &str = "GET";

// == Commands ==
/// Encodes a command as an array of bulk strings.
pub fn encode_command(args: &[&str]) -> Bytes {
    Frame::Array(args.iter().map(|arg| Frame::bulk(arg)).collect()).to_bytes()
}

/// Wraps a key into a RESP GET request.
pub fn encode_get_request(key: &str) -> Bytes {
    encode_command(&[GET_COMMAND, key])
}

/// Extracts the key from a RESP GET request.
///
/// `src` must hold exactly one frame: an array of two bulk strings naming
/// `GET` (any ASCII case) and the key.
pub fn decode_get_request(src: &[u8]) -> Result<String, FrameError> {
    let (frame, used) = Frame::parse(src)?;
    if used != src.len() {
        return Err(FrameError::Invalid(format!(
            "{} trailing bytes after request",
            src.len() - used
        )));
    }
    get_key_from_frame(frame)
}

/// Extracts the key from an already parsed GET request frame.
pub fn get_key_from_frame(frame: Frame) -> Result<String, FrameError> {
    let mut parts = match frame {
        Frame::Array(parts) if parts.len() == 2 => parts,
        Frame::Array(parts) => {
            return Err(FrameError::Invalid(format!(
                "expected 2 request parts, got {}",
                parts.len()
            )))
        }
        other => {
            return Err(FrameError::Invalid(format!(
                "expected request array, got {}",
                frame_kind(&other)
            )))
        }
    };

    let key = parts.pop().map(bulk_text).transpose()?;
    let command = parts.pop().map(bulk_text).transpose()?;

    match (command, key) {
        (Some(command), Some(key)) if command.eq_ignore_ascii_case(GET_COMMAND) => Ok(key),
        (Some(command), _) => Err(FrameError::Invalid(format!(
            "unsupported command {:?}",
            command
        ))),
        _ => Err(FrameError::Invalid("empty request".to_string())),
    }
}

// == Replies ==
/// Wraps a lookup result into a RESP bulk reply.
pub fn encode_get_reply(value: Option<&str>) -> Bytes {
    match value {
        Some(value) => Frame::bulk(value).to_bytes(),
        None => Frame::Null.to_bytes(),
    }
}

/// Extracts the value from a RESP bulk reply. `Ok(None)` means absent.
pub fn decode_get_reply(src: &[u8]) -> Result<Option<String>, FrameError> {
    let (frame, _) = Frame::parse(src)?;
    get_value_from_frame(frame)
}

/// Interprets a parsed reply frame as a GET result.
pub fn get_value_from_frame(frame: Frame) -> Result<Option<String>, FrameError> {
    match frame {
        Frame::Null => Ok(None),
        bulk @ Frame::Bulk(_) => bulk_text(bulk).map(Some),
        other => Err(FrameError::Invalid(format!(
            "expected bulk reply, got {}",
            frame_kind(&other)
        ))),
    }
}

/// Encodes an error reply.
pub fn encode_error_reply(message: &str) -> Bytes {
    // Error lines cannot carry line breaks
    let line: String = message
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect();
    let mut dst = BytesMut::new();
    Frame::Error(format!("ERR {}", line)).encode(&mut dst);
    dst.freeze()
}

fn bulk_text(frame: Frame) -> Result<String, FrameError> {
    match frame {
        Frame::Bulk(data) => String::from_utf8(data.to_vec())
            .map_err(|_| FrameError::Invalid("bulk string is not UTF-8".to_string())),
        other => Err(FrameError::Invalid(format!(
            "expected bulk string, got {}",
            frame_kind(&other)
        ))),
    }
}

/// Short name of a frame type, for error messages.
pub fn frame_kind(frame: &Frame) -> &'static str {
    match frame {
        Frame::Simple(_) => "simple string",
        Frame::Error(_) => "error",
        Frame::Integer(_) => "integer",
        Frame::Bulk(_) => "bulk string",
        Frame::Null => "null",
        Frame::Array(_) => "array",
    }
}
