//! Query gateway: the typed `/api` surface.
//!
//! # Data Flow
//! ```text
//! GET /api/labels, /api/label/{name}/values, /api/query_range, /api/search
//!     → handlers.rs (session check, extract params)
//!     → service.rs QueryGateway (build Loki URL, UpstreamClient GET)
//!     → backend status, content type and body relayed
//!
//! POST /api/export
//!     → ExportRequest validated (non-blank query)
//!     → ranged query
//!     → json: body as attachment | csv: csv.rs conversion, then attachment
//! ```
//!
//! # Design Decisions
//! - Nothing is sent upstream without a captured session
//! - Backend errors are passed through, never wrapped
//! - CSV conversion parses the whole body first; no partial files

pub mod csv;
pub mod export;
pub mod handlers;
pub mod service;

pub use export::{ExportFile, ExportFormat, ExportRequest};
pub use service::{QueryGateway, RangeQuery, UpstreamBody, DEFAULT_LIMIT};
