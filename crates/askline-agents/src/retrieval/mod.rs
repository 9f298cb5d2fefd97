//! Information retrieval strategies.
//!
//! The strategy is picked once from configuration: live web search when both
//! search credentials are present, simulated records otherwise. Retrieval
//! never fails toward the Supervisor; the live strategy degrades to
//! simulated records on its own.

mod live;
mod search_client;
mod simulated;

pub use live::{build_query, LiveRetriever};
pub use search_client::{CustomSearchClient, SearchResponse};
pub use simulated::SimulatedRetriever;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use askline_core::config::SearchConfig;
use askline_core::types::RetrievalResult;

use crate::workers::Outcome;

/// Which retrieval strategy is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    Live,
    Simulated,
}

impl RetrievalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::Live => "live",
            RetrievalMode::Simulated => "simulated",
        }
    }
}

impl std::fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gathers supporting context for synthesis.
#[async_trait]
pub trait Retriever: Send + Sync {
    fn mode(&self) -> RetrievalMode;

    /// Fetch context for `enhanced_prompt`. Always yields a result.
    async fn retrieve(&self, enhanced_prompt: &str, keywords: &[String]) -> Outcome<RetrievalResult>;
}

/// Select the retrieval strategy for this configuration.
pub fn retriever_from_config(config: &SearchConfig) -> Arc<dyn Retriever> {
    if !config.is_configured() {
        tracing::info!("Search credentials not configured, using simulated retrieval");
        return Arc::new(SimulatedRetriever::new());
    }

    match LiveRetriever::from_config(config) {
        Ok(live) => {
            tracing::info!("Using live web search retrieval");
            Arc::new(live)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Live search unavailable, using simulated retrieval");
            Arc::new(SimulatedRetriever::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_search_selects_simulated() {
        let retriever = retriever_from_config(&SearchConfig::default());
        assert_eq!(retriever.mode(), RetrievalMode::Simulated);
    }

    #[test]
    fn test_partial_credentials_select_simulated() {
        let config = SearchConfig {
            api_key: Some("key".to_string()),
            ..SearchConfig::default()
        };
        assert_eq!(retriever_from_config(&config).mode(), RetrievalMode::Simulated);
    }

    #[test]
    fn test_full_credentials_select_live() {
        let config = SearchConfig {
            api_key: Some("key".to_string()),
            engine_id: Some("cx".to_string()),
            ..SearchConfig::default()
        };
        assert_eq!(retriever_from_config(&config).mode(), RetrievalMode::Live);
    }

    #[test]
    fn test_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RetrievalMode::Live).unwrap(), "\"live\"");
        assert_eq!(RetrievalMode::Simulated.to_string(), "simulated");
    }
}
