//! Upstream (backend) communication.
//!
//! # Data Flow
//! ```text
//! proxy / gateway
//!     → UpstreamRequest (method, url, headers, optional streaming body)
//!     → UpstreamClient::send (session cookie attached)
//!     → reqwest::Response (headers read, body still streaming)
//! ```
//!
//! # Design Decisions
//! - One reqwest client shared by every handler (connection pooling)
//! - Redirects are never followed; the caller sees them as-is
//! - No timeout beyond the connect timeout

pub mod client;

pub use client::{UpstreamClient, UpstreamError, UpstreamRequest};
