//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → /proxy/** → proxy::forward (streamed passthrough)
//!     → /api/*    → session gate → gateway::handlers
//!     → Send to client
//! ```

pub mod server;

pub use server::{AppState, HttpServer};
