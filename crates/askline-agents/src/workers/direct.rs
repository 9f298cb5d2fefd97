use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use askline_core::types::DirectAnswerDecision;

use super::{absorb, ask, quoted, DirectAnswerer, Outcome};
use crate::decode::{confidence_or_default, StructuredOutput};
use crate::error::AgentError;
use crate::llm::TextGenerator;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectAnswerPayload {
    #[serde(default)]
    needs_internet_search: Option<bool>,
    #[serde(default)]
    direct_response: Option<String>,
    #[serde(default)]
    search_required: Option<bool>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

impl StructuredOutput for DirectAnswerPayload {}

impl From<DirectAnswerPayload> for DirectAnswerDecision {
    fn from(payload: DirectAnswerPayload) -> Self {
        Self {
            needs_internet_search: payload.needs_internet_search,
            direct_response: payload.direct_response,
            search_required: payload.search_required,
            reasoning: payload.reasoning.unwrap_or_default(),
            confidence: confidence_or_default(payload.confidence),
        }
    }
}

fn build_prompt(query: &str, intent: &str, level: &str) -> String {
    format!(
        r#"You decide whether a question can be answered directly or needs an internet search.

Question: {query}
Intent: {intent}
Difficulty level: {level}

Decide whether your internal knowledge is enough or whether up-to-date information from the internet is required.

Answer directly for:
- general, well-established concepts
- basic definitions
- settled historical knowledge
- explanations of well-known processes

Search the internet for:
- current or recent information
- specific, frequently updated data
- recent events
- current statistics

If you can answer directly, give a simple, clear answer of at most 150 words.

Reply with a single JSON object:
{{
  "needsInternetSearch": false,
  "directResponse": "the direct answer when no search is needed",
  "searchRequired": false,
  "reasoning": "why you decided this way",
  "confidence": 0.85
}}"#,
        query = quoted(query),
        intent = quoted(intent),
        level = quoted(level)
    )
}

/// Direct-answer check backed by a text-generation model.
pub struct LlmDirectAnswerer {
    generator: Arc<dyn TextGenerator>,
}

impl LlmDirectAnswerer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl DirectAnswerer for LlmDirectAnswerer {
    async fn decide(
        &self,
        query: &str,
        intent: &str,
        level: &str,
    ) -> Result<Outcome<DirectAnswerDecision>, AgentError> {
        let prompt = build_prompt(query, intent, level);
        let result = ask::<DirectAnswerPayload>(self.generator.as_ref(), &prompt)
            .await
            .map(DirectAnswerDecision::from);
        Ok(absorb("direct_answerer", result, DirectAnswerDecision::fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::testing::ScriptedGenerator;

    #[tokio::test]
    async fn test_direct_answer_reply() {
        let reply = r#"{"needsInternetSearch": false, "directResponse": "Paris is the capital of France.", "searchRequired": false, "reasoning": "settled fact", "confidence": 0.95}"#;
        let generator = Arc::new(ScriptedGenerator::replying(reply));
        let worker = LlmDirectAnswerer::new(generator.clone());

        let decision = worker
            .decide("What is the capital of France?", "simple question", "simple")
            .await
            .unwrap()
            .into_value();
        assert_eq!(decision.direct_answer(), Some("Paris is the capital of France."));
        assert_eq!(decision.confidence, 0.95);

        let prompt = generator.last_prompt();
        assert!(prompt.contains("Intent: \"simple question\""));
        assert!(prompt.contains("Difficulty level: \"simple\""));
    }

    #[tokio::test]
    async fn test_search_needed_reply_has_no_answer() {
        let reply = r#"{"needsInternetSearch": true, "searchRequired": true, "reasoning": "recent data"}"#;
        let worker = LlmDirectAnswerer::new(Arc::new(ScriptedGenerator::replying(reply)));

        let decision = worker.decide("q", "i", "complex").await.unwrap().into_value();
        assert_eq!(decision.needs_internet_search, Some(true));
        assert_eq!(decision.direct_answer(), None);
        assert_eq!(decision.confidence, 0.8);
    }

    #[tokio::test]
    async fn test_absent_flag_is_not_a_direct_answer() {
        let reply = r#"{"directResponse": "maybe"}"#;
        let worker = LlmDirectAnswerer::new(Arc::new(ScriptedGenerator::replying(reply)));

        let decision = worker.decide("q", "i", "unknown").await.unwrap().into_value();
        assert_eq!(decision.needs_internet_search, None);
        assert_eq!(decision.direct_answer(), None);
    }

    #[tokio::test]
    async fn test_array_reply_is_not_a_direct_answer() {
        let worker = LlmDirectAnswerer::new(Arc::new(ScriptedGenerator::replying(r#"[false, "Paris."]"#)));

        let outcome = worker.decide("What is the capital of France?", "i", "simple").await.unwrap();
        assert_eq!(outcome.fallback_reason(), Some("decode error: expected a JSON object"));
        assert_eq!(outcome.value().needs_internet_search, Some(true));
        assert_eq!(outcome.value().direct_answer(), None);
    }

    #[tokio::test]
    async fn test_failure_prefers_search() {
        let worker = LlmDirectAnswerer::new(Arc::new(ScriptedGenerator::failing()));

        let outcome = worker.decide("q", "i", "medium").await.unwrap();
        assert!(outcome.is_fallback());
        assert_eq!(outcome.value().needs_internet_search, Some(true));
        assert_eq!(outcome.value().direct_response, None);
    }
}
