//! Error types surfaced to HTTP callers.

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use axum::body::Bytes;
use thiserror::Error;

use crate::upstream::UpstreamError;

/// Message returned for any API call made before a session was captured.
pub const NO_SESSION_MESSAGE: &str = "No grafana session. Please login via proxy.";

/// Errors produced by the query gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No backend session cookie has been captured yet.
    #[error("{}", NO_SESSION_MESSAGE)]
    NoSession,

    /// The request was rejected before reaching the backend.
    #[error("{0}")]
    Validation(String),

    /// The backend answered with a non-success status; passed through verbatim.
    #[error("backend returned {status}")]
    UpstreamStatus {
        status: StatusCode,
        content_type: Option<HeaderValue>,
        body: Bytes,
    },

    /// The backend could not be reached.
    #[error(transparent)]
    Transport(#[from] UpstreamError),

    /// The backend body could not be converted.
    #[error("malformed backend response: {0}")]
    MalformedUpstreamBody(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::NoSession => {
                (StatusCode::UNAUTHORIZED, NO_SESSION_MESSAGE).into_response()
            }
            GatewayError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            GatewayError::UpstreamStatus {
                status,
                content_type,
                body,
            } => {
                let mut response = (status, body).into_response();
                if let Some(ct) = content_type {
                    response.headers_mut().insert(CONTENT_TYPE, ct);
                }
                response
            }
            GatewayError::Transport(e) => {
                tracing::error!(error = %e, "Upstream request failed");
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
            GatewayError::MalformedUpstreamBody(msg) => {
                tracing::warn!(error = %msg, "Cannot convert backend response");
                (
                    StatusCode::BAD_GATEWAY,
                    format!("Malformed backend response: {}", msg),
                )
                    .into_response()
            }
        }
    }
}
