use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use askline_core::config::SearchConfig;
use askline_core::types::RetrievalResult;

use super::search_client::CustomSearchClient;
use super::simulated::SimulatedRetriever;
use super::{RetrievalMode, Retriever};
use crate::error::AgentError;
use crate::workers::Outcome;

static NON_ALPHANUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s]+").unwrap());

/// Build the web search query.
///
/// The space-joined keywords come first, followed by the prompt with
/// punctuation removed, whitespace collapsed, and cut to `char_limit`
/// characters.
pub fn build_query(enhanced_prompt: &str, keywords: &[String], char_limit: usize) -> String {
    let stripped = NON_ALPHANUMERIC_RE.replace_all(enhanced_prompt, "");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let cleaned: String = collapsed.chars().take(char_limit).collect();

    let keywords = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    [keywords.as_str(), cleaned.trim_end()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Web search with simulated records as the safety net.
pub struct LiveRetriever {
    client: CustomSearchClient,
    simulated: SimulatedRetriever,
    query_char_limit: usize,
}

impl LiveRetriever {
    pub fn new(client: CustomSearchClient, query_char_limit: usize) -> Self {
        Self {
            client,
            simulated: SimulatedRetriever::new(),
            query_char_limit,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Result<Self, AgentError> {
        Ok(Self::new(
            CustomSearchClient::from_config(config)?,
            config.query_char_limit,
        ))
    }

    fn fall_back(&self, enhanced_prompt: &str, keywords: &[String], reason: String) -> Outcome<RetrievalResult> {
        tracing::warn!(reason = %reason, "Live search unusable, serving simulated records");
        Outcome::Fallback {
            value: self.simulated.records(enhanced_prompt, keywords),
            reason,
        }
    }
}

#[async_trait]
impl Retriever for LiveRetriever {
    fn mode(&self) -> RetrievalMode {
        RetrievalMode::Live
    }

    async fn retrieve(&self, enhanced_prompt: &str, keywords: &[String]) -> Outcome<RetrievalResult> {
        let query = build_query(enhanced_prompt, keywords, self.query_char_limit);
        if query.is_empty() {
            return self.fall_back(enhanced_prompt, keywords, "empty search query".to_string());
        }

        match self.client.search(&query).await {
            Ok(response) if response.hits.is_empty() => {
                self.fall_back(enhanced_prompt, keywords, "search returned no results".to_string())
            }
            Ok(response) => {
                tracing::info!(hits = response.hits.len(), "Live search succeeded");
                Outcome::Produced(RetrievalResult::from_hits(response.hits))
            }
            Err(e) => self.fall_back(enhanced_prompt, keywords, e.to_string()),
        }
    }
}
