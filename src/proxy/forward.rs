//! Transparent request forwarding with session capture.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;
use crate::proxy::headers::{
    declares_body, forwardable_request_headers, forwardable_response_headers,
};
use crate::session::{capture_set_cookies, SessionStore};
use crate::upstream::{UpstreamClient, UpstreamError, UpstreamRequest};

/// Forwards everything under a path prefix to the backend.
#[derive(Debug)]
pub struct ReverseProxy {
    upstream: Arc<UpstreamClient>,
    session: Arc<dyn SessionStore>,
    prefix: String,
}

impl ReverseProxy {
    pub fn new(
        upstream: Arc<UpstreamClient>,
        session: Arc<dyn SessionStore>,
        prefix: impl Into<String>,
    ) -> Self {
        let prefix = prefix.into().trim_end_matches('/').to_string();
        Self {
            upstream,
            session,
            prefix,
        }
    }

    /// Forward one request. Transport failures become 502.
    pub async fn forward(&self, request: Request<Body>) -> Response {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        match self.try_forward(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(method = %method, path = %path, error = %e, "Upstream error");
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }

    async fn try_forward(&self, request: Request<Body>) -> Result<Response, UpstreamError> {
        let (parts, body) = request.into_parts();

        let target = self
            .upstream
            .proxy_url(&target_path(&parts.uri, &self.prefix));

        tracing::debug!(method = %parts.method, target = %target, "Proxying request");

        let mut upstream_request = UpstreamRequest::new(parts.method.clone(), target);
        upstream_request.headers = forwardable_request_headers(&parts.headers);
        if declares_body(&parts.headers) {
            upstream_request.body = Some(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream_response = self.upstream.send(upstream_request).await?;

        // Session capture happens before anything is relayed.
        let captured = capture_set_cookies(self.session.as_ref(), upstream_response.headers());
        if captured > 0 {
            tracing::info!(cookies = captured, "Captured backend session");
        }

        let status = upstream_response.status();
        let headers = forwardable_response_headers(upstream_response.headers());

        let mut response = Response::new(Body::from_stream(upstream_response.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// Path and query to request on the backend: the part of `uri` after `prefix`.
/// Percent-encoding is preserved as received.
pub fn target_path(uri: &Uri, prefix: &str) -> String {
    let rest = uri.path().strip_prefix(prefix).unwrap_or(uri.path());
    let rest = rest.trim_start_matches('/');

    match uri.query() {
        Some(query) => format!("/{}?{}", rest, query),
        None => format!("/{}", rest),
    }
}

/// Route handler for `ANY {prefix}` and `ANY {prefix}/{*path}`.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.proxy.forward(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_target_path_strips_prefix() {
        assert_eq!(target_path(&uri("/proxy/api/login"), "/proxy"), "/api/login");
        assert_eq!(
            target_path(&uri("/proxy/api/ds/query?ds_type=loki"), "/proxy"),
            "/api/ds/query?ds_type=loki"
        );
    }

    #[test]
    fn test_empty_wildcard_is_backend_root() {
        assert_eq!(target_path(&uri("/proxy"), "/proxy"), "/");
        assert_eq!(target_path(&uri("/proxy/"), "/proxy"), "/");
        assert_eq!(target_path(&uri("/proxy?orgId=1"), "/proxy"), "/?orgId=1");
    }

    #[test]
    fn test_encoding_preserved() {
        assert_eq!(
            target_path(&uri("/proxy/explore%2Fleft?x=%7Bapp%7D"), "/proxy"),
            "/explore%2Fleft?x=%7Bapp%7D"
        );
    }
}
