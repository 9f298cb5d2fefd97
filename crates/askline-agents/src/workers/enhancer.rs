use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use askline_core::types::EnhancedContext;

use super::{absorb, ask, quoted, Outcome, PromptEnhancer};
use crate::decode::{require_text, StructuredOutput};
use crate::error::AgentError;
use crate::llm::TextGenerator;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnhancementPayload {
    enhanced_prompt: String,
    intent: String,
    keywords: Vec<String>,
}

impl StructuredOutput for EnhancementPayload {
    fn validate(&self) -> Result<(), String> {
        require_text("enhancedPrompt", &self.enhanced_prompt)?;
        require_text("intent", &self.intent)
    }
}

impl From<EnhancementPayload> for EnhancedContext {
    fn from(payload: EnhancementPayload) -> Self {
        Self {
            enhanced_prompt: payload.enhanced_prompt,
            intent: payload.intent,
            keywords: payload
                .keywords
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }
}

fn build_prompt(query: &str) -> String {
    format!(
        r#"You are a natural language processing specialist. Analyze the following transcribed question and:

1. Rewrite and structure it into a prompt suited for an efficient search
2. Identify the user's intent
3. Extract the keywords most relevant for searching

Transcript: {query}

Reply with a single JSON object:
{{
  "enhancedPrompt": "improved, structured prompt",
  "intent": "identified intent",
  "keywords": ["keyword1", "keyword2", "keyword3"]
}}"#,
        query = quoted(query)
    )
}

/// Prompt enhancer backed by a text-generation model.
pub struct LlmPromptEnhancer {
    generator: Arc<dyn TextGenerator>,
}

impl LlmPromptEnhancer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl PromptEnhancer for LlmPromptEnhancer {
    async fn enhance(&self, query: &str) -> Result<Outcome<EnhancedContext>, AgentError> {
        let result = ask::<EnhancementPayload>(self.generator.as_ref(), &build_prompt(query))
            .await
            .map(EnhancedContext::from);
        Ok(absorb("prompt_enhancer", result, || {
            EnhancedContext::fallback(query)
        }))
    }
}
