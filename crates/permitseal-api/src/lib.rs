//! PermitSeal HTTP API
//!
//! Axum surface over the document pipeline and the injected backend pair:
//! multipart upload, CRUD and download routes, the SSE change feed, and the
//! stale-document admin view.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use setup::initialize_app;
pub use state::AppState;
