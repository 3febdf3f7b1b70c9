//! Background Tasks Module
//!
//! Contains background tasks that run periodically during proxy operation.
//!
//! # Tasks
//! - Expiry sweep: removes cache entries untouched for longer than the
//!   staleness threshold

mod expiry;

pub use expiry::ExpiryDaemon;
