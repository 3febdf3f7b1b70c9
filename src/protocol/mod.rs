//! Protocol Module
//!
//! RESP wire format shared by the TCP front and the backend client.

mod codec;
mod frame;

pub use codec::{
    decode_get_reply, decode_get_request, encode_command, encode_error_reply, encode_get_reply,
    encode_get_request, frame_kind, get_key_from_frame, get_value_from_frame, GET_COMMAND,
};
pub use frame::{Frame, FrameError, CRLF, MAX_BULK_LEN, MAX_DEPTH};
