//! Session cookie subsystem.
//!
//! # Data Flow
//! ```text
//! backend response (via proxy)
//!     → capture_set_cookies (join Set-Cookie values)
//!     → SessionStore::set (atomic replace)
//!
//! gateway / proxy request
//!     → UpstreamClient reads SessionStore::get
//!     → Cookie header on the outbound request
//! ```
//!
//! # Design Decisions
//! - One live session for the whole process, last writer wins
//! - Nothing is persisted; a restart means logging in through the proxy again
//! - Passed around as `Arc<dyn SessionStore>`, never a global

pub mod store;

pub use store::{capture_set_cookies, SessionStore, SharedSessionStore};
