//! Application state shared across all route handlers.
//!
//! AppState is passed to handlers via axum's State extractor. Everything in
//! it is read-only after startup.

use std::sync::Arc;
use std::time::Instant;

use askline_agents::Supervisor;
use askline_core::config::AsklineConfig;
use askline_core::types::SearchStatus;

/// Shared application state.
///
/// All fields use `Arc` or are cheap to clone across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AsklineConfig>,
    /// The pipeline every chat request runs through.
    pub supervisor: Arc<Supervisor>,
    /// Search credential report, computed once at startup.
    pub search_status: SearchStatus,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: AsklineConfig, supervisor: Supervisor) -> Self {
        let search_status = config.search.status();
        Self {
            config: Arc::new(config),
            supervisor: Arc::new(supervisor),
            search_status,
            start_time: Instant::now(),
        }
    }
}
