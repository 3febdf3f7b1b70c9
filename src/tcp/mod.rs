//! TCP Module
//!
//! Binary front: accepts a connection, reads one RESP `GET` request, replies
//! with one bulk frame and closes the connection.

mod connection;
mod listener;

pub use connection::{handle_connection, MAX_REQUEST_SIZE};
pub use listener::{bind, serve};
