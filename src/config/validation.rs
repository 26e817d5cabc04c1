//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Backend base URL must be present and absolute
//! - Listener address must parse, TLS needs both files
//! - Proxy prefix must not shadow the API surface
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("backend.base_url is not set")]
    MissingBaseUrl,

    #[error("backend.base_url '{0}' is not an absolute http(s) URL")]
    InvalidBaseUrl(String),

    #[error("listener.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),

    #[error("listener.tls requires both cert_path and key_path")]
    IncompleteTls,

    #[error("proxy.path_prefix '{0}' must start with '/' and must not be '/' or overlap '/api' or '/healthz'")]
    InvalidProxyPrefix(String),
}

/// Paths served by the proxy itself. The passthrough prefix may not equal or sit under them.
pub const RESERVED_PATHS: [&str; 2] = ["/api", "/healthz"];

fn is_valid_proxy_prefix(raw: &str) -> bool {
    let prefix = raw.trim_end_matches('/');
    if !raw.starts_with('/') || prefix.is_empty() {
        return false;
    }
    // Route syntax characters would change what the router registers.
    if prefix.contains(['{', '}', '*']) {
        return false;
    }
    !RESERVED_PATHS
        .iter()
        .any(|reserved| prefix == *reserved || prefix.starts_with(&format!("{}/", reserved)))
}

/// Check the configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let base = config.backend.trimmed_base_url();
    if base.trim().is_empty() {
        errors.push(ValidationError::MissingBaseUrl);
    } else {
        match Url::parse(base) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            _ => errors.push(ValidationError::InvalidBaseUrl(base.to_string())),
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            errors.push(ValidationError::IncompleteTls);
        }
    }

    if !is_valid_proxy_prefix(&config.proxy.path_prefix) {
        errors.push(ValidationError::InvalidProxyPrefix(
            config.proxy.path_prefix.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
