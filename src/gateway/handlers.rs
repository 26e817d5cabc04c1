use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::GatewayError;
use crate::gateway::export::{ExportFile, ExportRequest};
use crate::gateway::service::{RangeQuery, UpstreamBody};
use crate::http::server::AppState;

/// Rejects every `/api` call until the proxy has captured a session,
/// before any extractor gets a chance to reject the request for other reasons.
pub async fn require_session(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.session.has_session() {
        return GatewayError::NoSession.into_response();
    }
    next.run(request).await
}

pub async fn labels(State(state): State<AppState>) -> Result<UpstreamBody, GatewayError> {
    state.gateway.list_labels().await
}

pub async fn label_values(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<UpstreamBody, GatewayError> {
    state.gateway.list_label_values(&name).await
}

pub async fn query_range(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<UpstreamBody, GatewayError> {
    state.gateway.query_range(&query).await
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<UpstreamBody, GatewayError> {
    state.gateway.search(&query).await
}

pub async fn export(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> Result<ExportFile, GatewayError> {
    let file = state.gateway.export(&request).await?;
    tracing::info!(
        file_name = %file.file_name,
        bytes = file.body.len(),
        "Export ready"
    );
    Ok(file)
}
