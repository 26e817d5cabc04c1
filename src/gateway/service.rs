//! Typed Loki API calls made on behalf of the captured session.

use std::sync::Arc;

use axum::{
    body::Bytes,
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::GatewayError;
use crate::gateway::csv::loki_json_to_csv;
use crate::gateway::export::{ExportFile, ExportFormat, ExportRequest};
use crate::session::SessionStore;
use crate::upstream::{UpstreamClient, UpstreamError};

/// Result limit used when the caller does not give one.
pub const DEFAULT_LIMIT: u32 = 1000;

/// Parameters of a ranged log query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RangeQuery {
    pub query: String,
    pub start: i64,
    pub end: i64,
    pub limit: u32,
}

impl Default for RangeQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            start: 0,
            end: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl From<&ExportRequest> for RangeQuery {
    fn from(req: &ExportRequest) -> Self {
        Self {
            query: req.query.clone(),
            start: req.start,
            end: req.end,
            limit: req.limit,
        }
    }
}

/// A fully read backend reply, relayed with its status and content type.
#[derive(Debug, Clone)]
pub struct UpstreamBody {
    pub status: StatusCode,
    pub content_type: HeaderValue,
    pub body: Bytes,
}

impl IntoResponse for UpstreamBody {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        response.headers_mut().insert(CONTENT_TYPE, self.content_type);
        response
    }
}

/// Label discovery, ranged queries and exports against the backend's Loki API.
#[derive(Debug)]
pub struct QueryGateway {
    upstream: Arc<UpstreamClient>,
    session: Arc<dyn SessionStore>,
    api_prefix: String,
}

impl QueryGateway {
    pub fn new(
        upstream: Arc<UpstreamClient>,
        session: Arc<dyn SessionStore>,
        api_prefix: impl Into<String>,
    ) -> Self {
        Self {
            upstream,
            session,
            api_prefix: api_prefix.into(),
        }
    }

    pub async fn list_labels(&self) -> Result<UpstreamBody, GatewayError> {
        self.require_session()?;
        let url = self.upstream.api_url(&self.api_prefix, &["labels"], &[])?;
        self.fetch(url).await
    }

    pub async fn list_label_values(&self, name: &str) -> Result<UpstreamBody, GatewayError> {
        self.require_session()?;
        let url = self
            .upstream
            .api_url(&self.api_prefix, &["label", name, "values"], &[])?;
        self.fetch(url).await
    }

    pub async fn query_range(&self, query: &RangeQuery) -> Result<UpstreamBody, GatewayError> {
        self.require_session()?;
        let url = self.range_url(query)?;
        self.fetch(url).await
    }

    /// Same contract as [`QueryGateway::query_range`].
    pub async fn search(&self, query: &RangeQuery) -> Result<UpstreamBody, GatewayError> {
        self.query_range(query).await
    }

    /// Run the export's query and package the result as a download.
    ///
    /// Backend errors come back as [`GatewayError::UpstreamStatus`] untouched.
    pub async fn export(&self, request: &ExportRequest) -> Result<ExportFile, GatewayError> {
        self.require_session()?;
        request.validate()?;

        let url = self.range_url(&RangeQuery::from(request))?;
        let reply = self.fetch(url).await?;
        if !reply.status.is_success() {
            return Err(GatewayError::UpstreamStatus {
                status: reply.status,
                content_type: Some(reply.content_type),
                body: reply.body,
            });
        }

        match request.export_format() {
            ExportFormat::Csv => {
                let csv = loki_json_to_csv(&reply.body)
                    .map_err(|e| GatewayError::MalformedUpstreamBody(e.to_string()))?;
                Ok(ExportFile::new(ExportFormat::Csv, csv))
            }
            ExportFormat::Json => Ok(ExportFile::new(ExportFormat::Json, reply.body)),
        }
    }

    fn require_session(&self) -> Result<(), GatewayError> {
        if self.session.has_session() {
            Ok(())
        } else {
            Err(GatewayError::NoSession)
        }
    }

    fn range_url(&self, query: &RangeQuery) -> Result<Url, UpstreamError> {
        self.upstream.api_url(
            &self.api_prefix,
            &["query_range"],
            &[
                ("query", query.query.clone()),
                ("start", query.start.to_string()),
                ("end", query.end.to_string()),
                ("limit", query.limit.to_string()),
            ],
        )
    }

    async fn fetch(&self, url: Url) -> Result<UpstreamBody, GatewayError> {
        let path = url.path().to_string();
        let response = self.upstream.get(url).await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));
        let body = response.bytes().await.map_err(UpstreamError::from)?;

        if !status.is_success() {
            tracing::warn!(path = %path, status = %status, "Backend returned error status");
        } else {
            tracing::debug!(path = %path, bytes = body.len(), "Backend query complete");
        }

        Ok(UpstreamBody {
            status,
            content_type,
            body,
        })
    }
}
