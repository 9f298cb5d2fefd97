use async_trait::async_trait;

use askline_core::types::{RetrievalResult, SearchHit};

use super::{RetrievalMode, Retriever};
use crate::workers::Outcome;

/// Characters of the prompt quoted in a simulated snippet.
const EXCERPT_CHARS: usize = 100;

const PLACEHOLDER_TOPIC: &str = "the requested topic";

/// Deterministic stand-in for web search.
#[derive(Debug, Default, Clone)]
pub struct SimulatedRetriever;

impl SimulatedRetriever {
    pub fn new() -> Self {
        Self
    }

    /// Build the simulated records for a prompt and keyword list.
    ///
    /// Two records always; a third listing the key terms when there are any.
    pub fn records(&self, enhanced_prompt: &str, keywords: &[String]) -> RetrievalResult {
        let terms: Vec<&str> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();

        let excerpt = excerpt(enhanced_prompt);
        let topic = if terms.is_empty() {
            excerpt.clone()
        } else {
            terms.join(" ")
        };

        let mut hits = vec![
            SearchHit {
                title: "Relevant information 1".to_string(),
                snippet: format!(
                    "Information related to {}. This is a simulated result that gives context on the searched topic.",
                    topic
                ),
                url: "https://example.com/1".to_string(),
            },
            SearchHit {
                title: "Relevant information 2".to_string(),
                snippet: format!(
                    "Additional details about {}. Complementary context for a more complete answer.",
                    excerpt
                ),
                url: "https://example.com/2".to_string(),
            },
        ];

        if !terms.is_empty() {
            hits.push(SearchHit {
                title: "Relevant information 3".to_string(),
                snippet: format!(
                    "Key terms: {}. Related concepts that broaden the answer.",
                    terms.join(", ")
                ),
                url: "https://example.com/3".to_string(),
            });
        }

        RetrievalResult::from_hits(hits)
    }
}

/// First `EXCERPT_CHARS` characters of the prompt, or a placeholder.
fn excerpt(prompt: &str) -> String {
    let text: String = prompt.trim().chars().take(EXCERPT_CHARS).collect();
    let text = text.trim_end();
    if text.is_empty() {
        PLACEHOLDER_TOPIC.to_string()
    } else {
        text.to_string()
    }
}

#[async_trait]
impl Retriever for SimulatedRetriever {
    fn mode(&self) -> RetrievalMode {
        RetrievalMode::Simulated
    }

    async fn retrieve(&self, enhanced_prompt: &str, keywords: &[String]) -> Outcome<RetrievalResult> {
        tracing::debug!(keywords = keywords.len(), "Building simulated retrieval records");
        Outcome::Produced(self.records(enhanced_prompt, keywords))
    }
}
