//! Upstream client implementation.
//!
//! Every request leaving the process goes through here, which is where the
//! captured session cookie gets attached.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{
    header::{COOKIE, USER_AGENT},
    HeaderMap, HeaderValue, Method,
};
use reqwest::{redirect, Client, Response};
use thiserror::Error;
use url::Url;

use crate::config::BackendConfig;
use crate::session::SessionStore;

/// Errors raised before or while talking to the backend.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The backend URL could not be built.
    #[error("invalid upstream URL: {0}")]
    Url(String),

    /// Connection, TLS or protocol failure.
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A request ready to be sent to the backend.
#[derive(Debug)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<reqwest::Body>,
}

impl UpstreamRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// HTTP client bound to the configured backend base URL.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    base_url: String,
    user_agent: Option<HeaderValue>,
    session: Arc<dyn SessionStore>,
}

impl UpstreamClient {
    pub fn new(config: &BackendConfig, session: Arc<dyn SessionStore>) -> Result<Self, UpstreamError> {
        // Redirects and compression are the browser's business, not ours.
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(redirect::Policy::none())
            .no_proxy()
            .build()?;

        let user_agent = match &config.user_agent {
            Some(ua) => Some(
                HeaderValue::from_str(ua)
                    .map_err(|_| UpstreamError::Url(format!("invalid user agent: {}", ua)))?,
            ),
            None => None,
        };

        Ok(Self {
            http,
            base_url: config.trimmed_base_url().to_string(),
            user_agent,
            session,
        })
    }

    /// Target for a proxied request. `path_and_query` must start with `/`.
    pub fn proxy_url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }

    /// Build an API URL below `prefix`, percent-encoding every segment and
    /// form-encoding the query pairs.
    pub fn api_url(
        &self,
        prefix: &str,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<Url, UpstreamError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| UpstreamError::Url(e.to_string()))?;

        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| UpstreamError::Url(format!("{} cannot be a base", self.base_url)))?;
            path.pop_if_empty();
            path.extend(prefix.split('/').filter(|s| !s.is_empty()));
            path.extend(segments);
        }

        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        Ok(url)
    }

    /// Send a request, attaching the session cookie when one is stored.
    ///
    /// Response headers are available as soon as this returns; the body is
    /// left on the wire for the caller to stream or collect.
    pub async fn send(&self, request: UpstreamRequest) -> Result<Response, UpstreamError> {
        let UpstreamRequest {
            method,
            url,
            mut headers,
            body,
        } = request;

        self.attach_session(&mut headers);

        let mut builder = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        Ok(builder.send().await?)
    }

    /// Plain GET used by the query gateway.
    pub async fn get(&self, url: Url) -> Result<Response, UpstreamError> {
        let mut request = UpstreamRequest::new(Method::GET, url.as_str());
        if let Some(ua) = &self.user_agent {
            request.headers.insert(USER_AGENT, ua.clone());
        }
        self.send(request).await
    }

    /// Replace any Cookie header with the stored session so exactly one leaves.
    fn attach_session(&self, headers: &mut HeaderMap) {
        let Some(cookie) = self.session.get() else {
            return;
        };

        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(_) => {
                tracing::warn!("Stored session cookie is not a valid header value, not attaching");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SharedSessionStore;

    fn client(base: &str) -> (UpstreamClient, Arc<SharedSessionStore>) {
        let store = Arc::new(SharedSessionStore::new());
        let config = BackendConfig {
            base_url: base.to_string(),
            ..BackendConfig::default()
        };
        (UpstreamClient::new(&config, store.clone()).unwrap(), store)
    }

    #[test]
    fn test_proxy_url_concatenates() {
        let (c, _) = client("http://grafana:3000/");
        assert_eq!(c.proxy_url("/"), "http://grafana:3000/");
        assert_eq!(c.proxy_url("/api/login?x=1"), "http://grafana:3000/api/login?x=1");
    }

    #[test]
    fn test_api_url_encodes_segments() {
        let (c, _) = client("http://grafana:3000/sub/");
        let url = c
            .api_url("/loki/api/v1", &["label", "app/name x", "values"], &[])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://grafana:3000/sub/loki/api/v1/label/app%2Fname%20x/values"
        );
    }

    #[test]
    fn test_api_url_query_pairs() {
        let (c, _) = client("http://grafana:3000");
        let url = c
            .api_url(
                "/loki/api/v1",
                &["query_range"],
                &[("query", "{app=\"web\"} |= \"a&b\"".to_string()), ("limit", "10".to_string())],
            )
            .unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("query".to_string(), "{app=\"web\"} |= \"a&b\"".to_string()));
        assert_eq!(pairs[1], ("limit".to_string(), "10".to_string()));
        assert!(url.path().ends_with("/loki/api/v1/query_range"));
    }

    #[test]
    fn test_attach_session_replaces_inbound_cookie() {
        let (c, store) = client("http://grafana:3000");
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("browser=1"));

        c.attach_session(&mut headers);
        assert_eq!(headers.get(COOKIE).unwrap(), "browser=1");

        store.set("grafana_session=s".into());
        c.attach_session(&mut headers);
        assert_eq!(headers.get_all(COOKIE).iter().count(), 1);
        assert_eq!(headers.get(COOKIE).unwrap(), "grafana_session=s");
    }
}
