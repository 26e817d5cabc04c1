//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use futures_util::StreamExt;
use grafana_session_proxy::{HttpServer, ProxyConfig, SessionStore, SharedSessionStore, Shutdown};
use tokio::net::TcpListener;

/// Two streams, two labels each, two entries each. One label and one line need quoting.
pub const QUERY_RANGE_BODY: &str = r#"{"status":"success","data":{"resultType":"streams","result":[{"stream":{"app":"web","env":"prod,eu"},"values":[["1700000000000000001","GET /index 200"],["1700000000000000002","said \"hi\", then left"]]},{"stream":{"app":"worker","env":"dev"},"values":[["1700000000000000003","job started"],["1700000000000000004","job done"]]}]}}"#;

pub const LABELS_BODY: &str = r#"{"status":"success","data":["app","env"]}"#;

/// A request as the mock backend saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Recorded {
    pub fn path(&self) -> &str {
        self.path_and_query.split('?').next().unwrap_or_default()
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let query = self.path_and_query.split_once('?').map(|(_, q)| q).unwrap_or_default();
        url::form_urlencoded::parse(query.as_bytes()).into_owned().collect()
    }
}

/// Handle to a running mock backend.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    endless_dropped: Arc<AtomicBool>,
}

impl MockBackend {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last(&self) -> Recorded {
        self.requests.lock().unwrap().last().cloned().expect("backend saw no request")
    }

    /// True once the body of an `/endless` response has been dropped by the server.
    pub fn endless_dropped(&self) -> bool {
        self.endless_dropped.load(Ordering::SeqCst)
    }
}

/// Sets its flag when dropped, i.e. when the server stops polling the body it lives in.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

async fn record(
    State(requests): State<Arc<Mutex<Vec<Recorded>>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

    requests.lock().unwrap().push(Recorded {
        method: parts.method.clone(),
        path_and_query: parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_default(),
        headers: parts.headers.clone(),
        body: body.clone(),
    });

    next.run(Request::from_parts(parts, Body::from(body))).await
}

async fn echo(request: Request<Body>) -> Response {
    let method = request.method().to_string();
    let body = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap_or_default();
    ([("x-echo-method", method)], body).into_response()
}

async fn login(Path(tag): Path<String>) -> Response {
    let mut response = (StatusCode::OK, "logged in").into_response();
    let headers = response.headers_mut();
    headers.append(
        header::SET_COOKIE,
        format!("grafana_session={}; Path=/; HttpOnly", tag).parse().unwrap(),
    );
    headers.append(
        header::SET_COOKIE,
        "grafana_session_expiry=99; Path=/".parse().unwrap(),
    );
    response
}

async fn chunked() -> Response {
    let chunks = futures_util::stream::iter(
        ["first,", "second,", "third"]
            .into_iter()
            .map(|c| Ok::<_, std::convert::Infallible>(Bytes::from(c))),
    );
    Body::from_stream(chunks).into_response()
}

/// Sends `head`, then nothing for five seconds, then `tail`.
async fn stalled() -> Response {
    let chunks = futures_util::stream::unfold(0u8, |step| async move {
        match step {
            0 => Some((Ok::<_, std::convert::Infallible>(Bytes::from_static(b"head")), 1)),
            1 => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Some((Ok(Bytes::from_static(b"tail")), 2))
            }
            _ => None,
        }
    });
    Body::from_stream(chunks).into_response()
}

/// A body that never ends: `head`, then a tick every 100ms.
fn endless(dropped: Arc<AtomicBool>) -> Response {
    let guard = DropFlag(dropped);
    let chunks = futures_util::stream::unfold((guard, true), |(guard, first)| async move {
        if !first {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        let chunk = if first { "head" } else { "tick" };
        Some((Ok::<_, std::convert::Infallible>(Bytes::from(chunk)), (guard, false)))
    });
    Body::from_stream(chunks).into_response()
}

/// Answers with the first request body chunk without waiting for the rest.
async fn first_chunk(request: Request<Body>) -> Response {
    let mut stream = request.into_body().into_data_stream();
    match stream.next().await {
        Some(Ok(chunk)) => chunk.into_response(),
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn query_range(Query(params): Query<Vec<(String, String)>>) -> Response {
    let query = params
        .iter()
        .find(|(k, _)| k == "query")
        .map(|(_, v)| v.as_str())
        .unwrap_or_default();

    match query {
        "bad" => (StatusCode::UNPROCESSABLE_ENTITY, "parse error at line 1").into_response(),
        "broken" => ([(header::CONTENT_TYPE, "application/json")], "<html>").into_response(),
        _ => ([(header::CONTENT_TYPE, "application/json")], QUERY_RANGE_BODY).into_response(),
    }
}

/// Start a recording backend on an ephemeral port.
pub async fn start_backend() -> MockBackend {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let endless_dropped = Arc::new(AtomicBool::new(false));
    let dropped = endless_dropped.clone();

    let app = Router::new()
        .route("/login/{tag}", any(login))
        .route("/teapot", any(|| async { (StatusCode::IM_A_TEAPOT, "short and stout") }))
        .route("/chunked", get(chunked))
        .route("/stalled", get(stalled))
        .route(
            "/endless",
            get(move || {
                let dropped = dropped.clone();
                async move { endless(dropped) }
            }),
        )
        .route(
            "/loki/api/v1/labels",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], LABELS_BODY) }),
        )
        .route(
            "/loki/api/v1/label/{name}/values",
            get(|Path(name): Path<String>| async move {
                axum::Json(serde_json::json!({"status": "success", "data": [name]}))
            }),
        )
        .route("/loki/api/v1/query_range", get(query_range))
        .fallback(echo)
        .layer(middleware::from_fn_with_state(requests.clone(), record))
        // Added after the recording layer, which would otherwise buffer the body.
        .route("/upload/first", any(first_chunk));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend {
        addr,
        requests,
        endless_dropped,
    }
}

/// A proxy under test.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub session: Arc<SharedSessionStore>,
    pub shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the proxy in front of `backend_url` on an ephemeral port.
pub async fn start_proxy(backend_url: &str) -> TestProxy {
    let mut config = ProxyConfig::default();
    config.backend.base_url = backend_url.to_string();

    let session = Arc::new(SharedSessionStore::new());
    let store: Arc<dyn SessionStore> = session.clone();
    let server = HttpServer::new(config, store).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy {
        addr,
        session,
        shutdown,
    }
}

/// Client that behaves like a browser minus redirects and proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
