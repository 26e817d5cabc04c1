//! Export request model and downloadable file response.

use axum::{
    body::Bytes,
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::gateway::DEFAULT_LIMIT;

/// Body of `POST /api/export`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportRequest {
    pub query: String,
    pub start: i64,
    pub end: i64,
    pub limit: u32,
    /// "json" or "csv", case-insensitive. Anything else exports JSON.
    pub format: String,
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            start: 0,
            end: 0,
            limit: DEFAULT_LIMIT,
            format: "json".to_string(),
        }
    }
}

impl ExportRequest {
    /// Reject requests that must never reach the backend.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.query.trim().is_empty() {
            return Err(GatewayError::Validation("Query is required".to_string()));
        }
        Ok(())
    }

    pub fn export_format(&self) -> ExportFormat {
        ExportFormat::parse(&self.format)
    }
}

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("csv") {
            ExportFormat::Csv
        } else {
            ExportFormat::Json
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }
}

/// `loki-export-<yyyyMMddHHmmss>.<ext>` in UTC.
pub fn export_file_name(format: ExportFormat, at: DateTime<Utc>) -> String {
    format!("loki-export-{}.{}", at.format("%Y%m%d%H%M%S"), format.extension())
}

/// A finished export, served as an attachment.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub format: ExportFormat,
    pub body: Bytes,
}

impl ExportFile {
    pub fn new(format: ExportFormat, body: impl Into<Bytes>) -> Self {
        Self {
            file_name: export_file_name(format, Utc::now()),
            format,
            body: body.into(),
        }
    }
}

impl IntoResponse for ExportFile {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename=\"{}\"", self.file_name);
        let mut response = (StatusCode::OK, self.body).into_response();
        let headers = response.headers_mut();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(self.format.content_type()),
        );
        // File names are built from ASCII only.
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            headers.insert(CONTENT_DISPOSITION, value);
        }
        response
    }
}
