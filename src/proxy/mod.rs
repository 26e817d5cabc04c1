//! Reverse proxy subsystem.
//!
//! # Data Flow
//! ```text
//! ANY /proxy/**
//!     → forward.rs (target = backend base + captured path + query)
//!     → headers.rs (drop Host)
//!     → UpstreamClient::send (session cookie, body streamed)
//!     → Set-Cookie captured into SessionStore
//!     → headers.rs (drop Transfer-Encoding)
//!     → status, headers and streamed body back to the caller
//! ```
//!
//! # Design Decisions
//! - No retries, no buffering; bodies are streamed in both directions
//! - A dropped client connection drops the upstream body stream with it
//! - Connection failures surface as 502 Bad Gateway

pub mod forward;
pub mod headers;

pub use forward::{proxy_handler, target_path, ReverseProxy};
