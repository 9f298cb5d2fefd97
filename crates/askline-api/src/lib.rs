//! Askline API crate - axum HTTP server, route handlers, SSE step streaming.
//!
//! Exposes the question-answering pipeline over HTTP: a JSON endpoint that
//! returns the full result, a Server-Sent Events endpoint that reports each
//! processing step as it happens, and health/search-status checks.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
