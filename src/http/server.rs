//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, session gate)
//! - Bind server to a plain or TLS listener
//! - Dispatch `/proxy/**` to the reverse proxy and `/api/*` to the gateway

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::gateway::{handlers, QueryGateway};
use crate::proxy::{proxy_handler, ReverseProxy};
use crate::session::SessionStore;
use crate::upstream::{UpstreamClient, UpstreamError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<dyn SessionStore>,
    pub proxy: Arc<ReverseProxy>,
    pub gateway: Arc<QueryGateway>,
    proxy_prefix: Arc<str>,
}

/// HTTP server for the session proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server sharing `session` between proxy and gateway.
    pub fn new(config: ProxyConfig, session: Arc<dyn SessionStore>) -> Result<Self, UpstreamError> {
        let upstream = Arc::new(UpstreamClient::new(&config.backend, session.clone())?);
        let prefix = config.proxy.path_prefix.trim_end_matches('/').to_string();

        let state = AppState {
            session: session.clone(),
            proxy: Arc::new(ReverseProxy::new(upstream.clone(), session.clone(), prefix.clone())),
            gateway: Arc::new(QueryGateway::new(
                upstream,
                session,
                config.backend.loki_api_prefix.clone(),
            )),
            proxy_prefix: prefix.into(),
        };

        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let prefix = state.proxy_prefix.to_string();

        let api = Router::new()
            .route("/api/labels", get(handlers::labels))
            .route("/api/label/{name}/values", get(handlers::label_values))
            .route("/api/query_range", get(handlers::query_range))
            .route("/api/search", get(handlers::search))
            .route("/api/export", post(handlers::export))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                handlers::require_session,
            ));

        Router::new()
            .route(&prefix, any(proxy_handler))
            .route(&format!("{}/{{*path}}", prefix), any(proxy_handler))
            .route("/healthz", get(health_handler))
            .merge(api)
            .fallback(fallback_handler)
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The assembled router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on a plain TCP listener until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.config.backend.trimmed_base_url(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server terminating TLS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(
            address = %addr,
            backend = %self.config.backend.trimmed_base_url(),
            "HTTPS server starting"
        );

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Liveness plus whether a backend session has been captured.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "session": state.session.has_session(),
    }))
}

/// Catches `{prefix}/` (which the wildcard route does not) and 404s the rest.
async fn fallback_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let path = request.uri().path();
    if path.starts_with(&format!("{}/", state.proxy_prefix)) {
        return state.proxy.forward(request).await;
    }
    (StatusCode::NOT_FOUND, "Not found").into_response()
}
