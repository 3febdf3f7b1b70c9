//! API Module
//!
//! HTTP handlers and routing for the textual front.
//!
//! # Endpoints
//! - `GET /ping` - Backend liveness passthrough
//! - `GET /:key` - Retrieve a value by key (raw body, 404 when absent)

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
