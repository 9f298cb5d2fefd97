use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use askline_core::types::{DifficultyAssessment, DifficultyLevel};

use super::{absorb, ask, quoted, DifficultyClassifier, Outcome};
use crate::decode::{confidence_or_default, StructuredOutput};
use crate::error::AgentError;
use crate::llm::TextGenerator;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DifficultyPayload {
    #[serde(default)]
    difficulty_level: Option<String>,
    #[serde(default)]
    needs_enhancement: Option<bool>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

impl StructuredOutput for DifficultyPayload {}

impl From<DifficultyPayload> for DifficultyAssessment {
    fn from(payload: DifficultyPayload) -> Self {
        Self {
            level: payload.difficulty_level.as_deref().and_then(DifficultyLevel::parse),
            needs_enhancement: payload.needs_enhancement,
            reasoning: payload.reasoning.unwrap_or_default(),
            confidence: confidence_or_default(payload.confidence),
        }
    }
}

fn build_prompt(query: &str) -> String {
    format!(
        r#"You are an expert in assessing question complexity. Analyze the question below and determine:

1. Its difficulty level (simple, medium, complex)
2. Whether it needs to be rewritten before further processing
3. The reasoning behind your assessment

Question: {query}

Criteria:
- SIMPLE: direct, factual questions about basic concepts
- MEDIUM: questions that need explanation or additional context
- COMPLEX: technical or multi-faceted questions that need in-depth research

Reply with a single JSON object:
{{
  "difficultyLevel": "simple|medium|complex",
  "needsEnhancement": true,
  "reasoning": "explanation of the assessment",
  "confidence": 0.85
}}"#,
        query = quoted(query)
    )
}

/// Difficulty classifier backed by a text-generation model.
pub struct LlmDifficultyClassifier {
    generator: Arc<dyn TextGenerator>,
}

impl LlmDifficultyClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl DifficultyClassifier for LlmDifficultyClassifier {
    async fn classify(&self, query: &str) -> Result<Outcome<DifficultyAssessment>, AgentError> {
        let result = ask::<DifficultyPayload>(self.generator.as_ref(), &build_prompt(query))
            .await
            .map(DifficultyAssessment::from);
        Ok(absorb(
            "difficulty_classifier",
            result,
            DifficultyAssessment::fallback,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::testing::ScriptedGenerator;
    use askline_core::types::FALLBACK_CONFIDENCE;

    fn classifier(generator: ScriptedGenerator) -> (LlmDifficultyClassifier, Arc<ScriptedGenerator>) {
        let generator = Arc::new(generator);
        (LlmDifficultyClassifier::new(generator.clone()), generator)
    }

    #[tokio::test]
    async fn test_classify_fenced_reply() {
        let reply = "```json\n{\"difficultyLevel\": \"simple\", \"needsEnhancement\": false, \"reasoning\": \"basic fact\", \"confidence\": 0.9}\n```";
        let (worker, generator) = classifier(ScriptedGenerator::replying(reply));

        let outcome = worker.classify("What is the capital of France?").await.unwrap();
        assert!(!outcome.is_fallback());

        let assessment = outcome.into_value();
        assert_eq!(assessment.level, Some(DifficultyLevel::Simple));
        assert_eq!(assessment.needs_enhancement, Some(false));
        assert_eq!(assessment.reasoning, "basic fact");
        assert_eq!(assessment.confidence, 0.9);
        assert!(generator
            .last_prompt()
            .contains("\"What is the capital of France?\""));
    }

    #[tokio::test]
    async fn test_missing_fields_are_forwarded_as_absent() {
        let (worker, _) = classifier(ScriptedGenerator::replying("{\"reasoning\": \"unsure\"}"));

        let assessment = worker.classify("hmm").await.unwrap().into_value();
        assert_eq!(assessment.level, None);
        assert_eq!(assessment.needs_enhancement, None);
        assert_eq!(assessment.confidence, 0.8);
        assert!(assessment.wants_enhancement());
    }

    #[tokio::test]
    async fn test_unknown_level_label_is_absent() {
        let (worker, _) = classifier(ScriptedGenerator::replying(
            "{\"difficultyLevel\": \"extreme\", \"needsEnhancement\": true}",
        ));
        let assessment = worker.classify("q").await.unwrap().into_value();
        assert_eq!(assessment.level, None);
        assert_eq!(assessment.level_label(), "unknown");
    }

    #[tokio::test]
    async fn test_backend_failure_uses_fallback() {
        let (worker, _) = classifier(ScriptedGenerator::failing());

        let outcome = worker.classify("anything").await.unwrap();
        assert!(outcome.is_fallback());
        let assessment = outcome.into_value();
        assert_eq!(assessment.level, Some(DifficultyLevel::Medium));
        assert_eq!(assessment.needs_enhancement, Some(true));
        assert_eq!(assessment.confidence, FALLBACK_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_empty_array_reply_uses_fallback() {
        let (worker, _) = classifier(ScriptedGenerator::replying("[]"));

        let outcome = worker.classify("anything").await.unwrap();
        assert!(outcome.is_fallback());
        assert_eq!(outcome.value().level, Some(DifficultyLevel::Medium));
    }

    #[tokio::test]
    async fn test_malformed_reply_uses_fallback() {
        let (worker, _) = classifier(ScriptedGenerator::replying("I think it is simple."));
        let outcome = worker.classify("anything").await.unwrap();
        assert!(outcome.fallback_reason().is_some());
    }
}
