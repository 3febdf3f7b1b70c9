//! API Handlers
//!
//! HTTP request handlers for the textual front.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::error::Result;
use crate::proxy::CacheProxy;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The caching proxy service
    pub proxy: Arc<CacheProxy>,
}

impl AppState {
    /// Creates a new AppState around a proxy.
    pub fn new(proxy: Arc<CacheProxy>) -> Self {
        Self { proxy }
    }
}

/// Handler for GET /ping
///
/// Passes the liveness check through to the backend and returns its payload.
/// An unreachable backend fails the probe with a server error. Only the
/// startup PING is fatal; a failed probe here leaves the process serving.
pub async fn ping_handler(State(state): State<AppState>) -> Result<String> {
    state.proxy.ping().await.map_err(|err| {
        error!(error = %err, "Backend liveness check failed");
        err
    })
}

/// Handler for GET /:key
///
/// Returns the raw value with 200, or 404 with an empty body when the key is
/// absent from both the cache and the backend.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    let response = match state.proxy.resolve(&key).await? {
        Some(value) => (StatusCode::OK, value).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::error::ProxyError;

    fn state_with(backend: Arc<MemoryBackend>) -> AppState {
        AppState::new(Arc::new(CacheProxy::new(backend, 100)))
    }

    #[tokio::test]
    async fn test_get_handler_found() {
        let backend = Arc::new(MemoryBackend::with_values([("test_key", "test_value")]));
        let state = state_with(backend);

        let response = get_handler(State(state), Path("test_key".to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_handler_not_found() {
        let state = state_with(Arc::new(MemoryBackend::new()));

        let response = get_handler(State(state), Path("nonexistent".to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_handler_backend_down() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_unavailable(true);
        let state = state_with(backend);

        let result = get_handler(State(state), Path("k".to_string())).await;

        assert!(matches!(result, Err(ProxyError::BackendUnavailable(_))));
    }

    #[tokio::test]
    async fn test_ping_handler() {
        let state = state_with(Arc::new(MemoryBackend::new()));
        assert_eq!(ping_handler(State(state)).await.unwrap(), "PONG");
    }
}
