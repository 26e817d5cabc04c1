//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the session proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// The observability backend being proxied to.
    pub backend: BackendConfig,

    /// Reverse proxy mount point.
    pub proxy: PassthroughConfig,

    /// Startup hooks.
    pub startup: StartupConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:5011").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5011".to_string(),
            tls: None,
        }
    }
}

impl ListenerConfig {
    /// Root URL a browser should use to reach this listener.
    pub fn public_url(&self) -> String {
        let scheme = if self.tls.is_some() { "https" } else { "http" };
        format!("{}://{}/", scheme, self.bind_address)
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Backend (Grafana / Loki) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend, e.g. "https://grafana.internal".
    /// Required: an empty value fails validation.
    pub base_url: String,

    /// Path under `base_url` where the Loki HTTP API lives.
    pub loki_api_prefix: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// User agent sent on gateway requests. Proxied requests keep the browser's.
    pub user_agent: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            loki_api_prefix: "/loki/api/v1".to_string(),
            connect_timeout_secs: 10,
            user_agent: None,
        }
    }
}

impl BackendConfig {
    /// Base URL without trailing slashes.
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Reverse proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PassthroughConfig {
    /// Path prefix under which every request is forwarded to the backend.
    pub path_prefix: String,
}

impl Default for PassthroughConfig {
    fn default() -> Self {
        Self {
            path_prefix: "/proxy".to_string(),
        }
    }
}

/// Best-effort actions run once the listener is bound.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StartupConfig {
    /// Open the system browser after startup.
    pub open_browser: bool,

    /// URL to open. Defaults to the listener's root URL.
    pub browser_url: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
