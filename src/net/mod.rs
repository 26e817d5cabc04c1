//! Network listener support.
//!
//! # Responsibilities
//! - Load TLS material for the HTTPS listener
//!
//! # Design Decisions
//! - TLS is terminated here and the backend is reached with a fresh connection
//! - Plain TCP listeners are bound directly in `main`

pub mod tls;
