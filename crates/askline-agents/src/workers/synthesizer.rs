use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use askline_core::types::FinalAnswer;

use super::{absorb, ask, quoted, Outcome, ResponseSynthesizer};
use crate::decode::{confidence_or_default, require_text, StructuredOutput};
use crate::error::AgentError;
use crate::llm::TextGenerator;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisPayload {
    conversational_response: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    follow_up_suggestions: Vec<String>,
}

impl StructuredOutput for SynthesisPayload {
    fn validate(&self) -> Result<(), String> {
        require_text("conversationalResponse", &self.conversational_response)
    }
}

impl From<SynthesisPayload> for FinalAnswer {
    fn from(payload: SynthesisPayload) -> Self {
        Self {
            conversational_response: payload.conversational_response,
            confidence: confidence_or_default(payload.confidence),
            follow_up_suggestions: payload.follow_up_suggestions,
        }
    }
}

fn build_prompt(query: &str, enhanced_prompt: &str, relevant_info: &str, intent: &str) -> String {
    format!(
        r#"You are a friendly, informative conversational assistant. Using the information below:

Original question: {query}
Enhanced prompt: {enhanced_prompt}
Intent: {intent}
Search information: {relevant_info}

Write a natural, informative conversational answer that:
1. Answers the user's question directly
2. Uses a friendly, conversational tone
3. Is concise (at most 60 words)
4. Checks whether the user wants more information

Reply with a single JSON object:
{{
  "conversationalResponse": "your conversational answer",
  "confidence": 0.85,
  "followUpSuggestions": ["suggestion 1", "suggestion 2"]
}}"#,
        query = quoted(query),
        enhanced_prompt = quoted(enhanced_prompt),
        intent = quoted(intent),
        relevant_info = quoted(relevant_info)
    )
}

/// Response synthesizer backed by a text-generation model.
pub struct LlmResponseSynthesizer {
    generator: Arc<dyn TextGenerator>,
}

impl LlmResponseSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl ResponseSynthesizer for LlmResponseSynthesizer {
    async fn synthesize(
        &self,
        query: &str,
        enhanced_prompt: &str,
        relevant_info: &str,
        intent: &str,
    ) -> Result<Outcome<FinalAnswer>, AgentError> {
        let prompt = build_prompt(query, enhanced_prompt, relevant_info, intent);
        let result = ask::<SynthesisPayload>(self.generator.as_ref(), &prompt)
            .await
            .map(FinalAnswer::from);
        Ok(absorb("response_synthesizer", result, FinalAnswer::fallback))
    }
}
