//! Pipeline workers.
//!
//! Each worker is a trait with one model-backed implementation. Workers
//! return an [`Outcome`]: either the value they produced or their documented
//! fallback, tagged with the reason. An `Err` is reserved for failures the
//! worker could not absorb.

mod difficulty;
mod direct;
mod enhancer;
mod synthesizer;

pub use difficulty::LlmDifficultyClassifier;
pub use direct::LlmDirectAnswerer;
pub use enhancer::LlmPromptEnhancer;
pub use synthesizer::LlmResponseSynthesizer;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use askline_core::types::{
    DifficultyAssessment, DirectAnswerDecision, EnhancedContext, FinalAnswer,
};

use crate::decode::{decode, StructuredOutput};
use crate::error::AgentError;
use crate::llm::TextGenerator;

/// What a stage handed back: its own value, or a fallback.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<T> {
    Produced(T),
    Fallback { value: T, reason: String },
}

impl<T> Outcome<T> {
    pub fn value(&self) -> &T {
        match self {
            Outcome::Produced(value) | Outcome::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Produced(value) | Outcome::Fallback { value, .. } => value,
        }
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Outcome::Produced(_) => None,
            Outcome::Fallback { reason, .. } => Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback { .. })
    }
}

impl<T: Serialize> Outcome<T> {
    /// JSON payload for the step log.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.value()).unwrap_or(serde_json::Value::Null)
    }
}

/// Classifies how hard a query is and whether it needs rewriting.
#[async_trait]
pub trait DifficultyClassifier: Send + Sync {
    async fn classify(&self, query: &str) -> Result<Outcome<DifficultyAssessment>, AgentError>;
}

/// Rewrites a query into a search-ready prompt with intent and keywords.
#[async_trait]
pub trait PromptEnhancer: Send + Sync {
    async fn enhance(&self, query: &str) -> Result<Outcome<EnhancedContext>, AgentError>;
}

/// Decides whether a query can be answered without retrieval.
#[async_trait]
pub trait DirectAnswerer: Send + Sync {
    async fn decide(
        &self,
        query: &str,
        intent: &str,
        level: &str,
    ) -> Result<Outcome<DirectAnswerDecision>, AgentError>;
}

/// Writes the final conversational answer.
#[async_trait]
pub trait ResponseSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        query: &str,
        enhanced_prompt: &str,
        relevant_info: &str,
        intent: &str,
    ) -> Result<Outcome<FinalAnswer>, AgentError>;
}

/// Send `prompt` and decode the reply as `P`.
pub(crate) async fn ask<P: StructuredOutput>(
    generator: &dyn TextGenerator,
    prompt: &str,
) -> Result<P, AgentError> {
    let raw = generator.generate(prompt).await?;
    decode(&raw)
}

/// Convert a worker-local failure into the worker's fallback value.
pub(crate) fn absorb<T>(
    worker: &'static str,
    result: Result<T, AgentError>,
    fallback: impl FnOnce() -> T,
) -> Outcome<T> {
    match result {
        Ok(value) => Outcome::Produced(value),
        Err(e) => {
            warn!(worker, error = %e, "Worker failed, using fallback");
            Outcome::Fallback {
                value: fallback(),
                reason: e.to_string(),
            }
        }
    }
}

/// Embed user text in a prompt as a JSON string literal.
pub(crate) fn quoted(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::AgentError;
    use crate::llm::TextGenerator;

    /// Generator that replays scripted replies in order and records prompts.
    pub struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<String, String>>>,
        pub prompts: Mutex<Vec<String>>,
        pub calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                prompts: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn replying(reply: &str) -> Self {
            Self::new(vec![Ok(reply)])
        }

        pub fn failing() -> Self {
            Self::new(vec![])
        }

        pub fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(message)) => Err(AgentError::Request(message)),
                None => Err(AgentError::Request("backend unavailable".to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let produced = Outcome::Produced(3);
        assert_eq!(*produced.value(), 3);
        assert!(!produced.is_fallback());
        assert_eq!(produced.fallback_reason(), None);

        let fallback = Outcome::Fallback {
            value: 7,
            reason: "timeout".to_string(),
        };
        assert!(fallback.is_fallback());
        assert_eq!(fallback.fallback_reason(), Some("timeout"));
        assert_eq!(fallback.into_value(), 7);
    }

    #[test]
    fn test_absorb_keeps_value_or_substitutes_fallback() {
        let ok = absorb("probe", Ok(1), || 0);
        assert_eq!(ok, Outcome::Produced(1));

        let failed = absorb("probe", Err(AgentError::EmptyResponse), || 0);
        assert_eq!(*failed.value(), 0);
        assert_eq!(failed.fallback_reason(), Some("empty response from backend"));
    }

    #[test]
    fn test_quoted_escapes_user_text() {
        assert_eq!(quoted("say \"hi\"\nnow"), "\"say \\\"hi\\\"\\nnow\"");
    }
}
