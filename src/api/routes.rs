//! API Routes
//!
//! Configures the Axum router for the textual front.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{get_handler, ping_handler, AppState};

/// Creates the router with both endpoints configured.
///
/// # Endpoints
/// - `GET /ping` - Backend liveness passthrough
/// - `GET /:key` - Cached lookup of `key`
///
/// `/ping` is matched before the key capture, so a key literally named
/// `ping` is not reachable over HTTP.
///
/// # Middleware
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping_handler))
        .route("/:key", get(get_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
