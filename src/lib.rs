//! Local Grafana session proxy.
//!
//! Proxies a browser to a Grafana/Loki backend, captures the backend's session
//! cookie on the way back, and reuses it for typed Loki queries and exports.

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod session;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use session::{SessionStore, SharedSessionStore};
