//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields
//!     → logging.rs subscriber (pretty or JSON on stdout)
//!
//! HTTP layer adds:
//!     → TraceLayer spans per request
//!     → x-request-id set on the way in, echoed on the way out
//! ```
//!
//! # Design Decisions
//! - Session cookie values are never logged, only that a capture happened
//! - RUST_LOG takes precedence over the configured level

pub mod logging;
