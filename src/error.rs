//! Error types for the caching proxy
//!
//! Provides unified error handling using thiserror. A key that is absent from
//! both the cache and the backend is a normal outcome (`Ok(None)`), never an
//! error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::protocol::FrameError;

// == Proxy Error Enum ==
/// Unified error type for the caching proxy.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Backend connection could not be established, broke, or timed out
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(#[from] std::io::Error),

    /// Backend reply could not be parsed or had an unexpected type
    #[error("Backend protocol error: {0}")]
    BackendProtocol(String),

    /// Backend answered with an error frame
    #[error("Backend error reply: {0}")]
    BackendReply(String),

    /// Inbound binary frame is not a valid retrieval command
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

impl ProxyError {
    /// Maps a frame error raised while reading a backend reply.
    pub fn from_backend_frame(err: FrameError) -> Self {
        ProxyError::BackendProtocol(err.to_string())
    }
}

// == Error Response Body ==
/// JSON body returned for every error condition on the HTTP front.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::BackendProtocol(_) => StatusCode::BAD_GATEWAY,
            ProxyError::BackendReply(_) => StatusCode::BAD_GATEWAY,
            ProxyError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching proxy.
pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_errors_are_server_errors() {
        let unavailable = ProxyError::BackendUnavailable(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert_eq!(
            unavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let reply = ProxyError::BackendReply("ERR wrong type".to_string());
        assert!(reply.into_response().status().is_server_error());

        let protocol = ProxyError::BackendProtocol("bad frame".to_string());
        assert!(protocol.into_response().status().is_server_error());
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse {
            error: "Something went wrong".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
