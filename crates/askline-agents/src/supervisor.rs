//! Supervisor: runs one query through the worker pipeline.
//!
//! Classify, optionally enhance, try a direct answer, and otherwise
//! retrieve context and synthesize. Every stage is recorded in the step
//! log. Worker fallbacks keep the run going; an error that escapes a worker
//! ends it with the degraded result.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use askline_core::types::{EnhancedContext, FinalAnswer, PipelineResult};

use crate::error::AgentError;
use crate::llm::TextGenerator;
use crate::retrieval::{RetrievalMode, Retriever};
use crate::steps::{NoopObserver, StepLog, StepObserver};
use crate::workers::{
    DifficultyClassifier, DirectAnswerer, LlmDifficultyClassifier, LlmDirectAnswerer,
    LlmPromptEnhancer, LlmResponseSynthesizer, Outcome, PromptEnhancer, ResponseSynthesizer,
};

pub const CLASSIFY_STEP: &str = "Analyzing question difficulty...";
pub const ENHANCE_STEP: &str = "Enhancing prompt...";
pub const DIRECT_ANSWER_STEP: &str = "Checking for a direct answer...";
pub const RETRIEVAL_STEP: &str = "Searching for information...";
pub const SYNTHESIS_STEP: &str = "Generating response...";

/// How a run that did not fail came to an end.
enum Conclusion {
    Direct { answer: String, confidence: f64 },
    Synthesized(FinalAnswer),
}

/// Coordinates the workers for each query.
///
/// Holds no per-run state, so one instance serves concurrent runs.
pub struct Supervisor {
    classifier: Arc<dyn DifficultyClassifier>,
    enhancer: Arc<dyn PromptEnhancer>,
    direct: Arc<dyn DirectAnswerer>,
    retriever: Arc<dyn Retriever>,
    synthesizer: Arc<dyn ResponseSynthesizer>,
}

impl Supervisor {
    pub fn new(
        classifier: Arc<dyn DifficultyClassifier>,
        enhancer: Arc<dyn PromptEnhancer>,
        direct: Arc<dyn DirectAnswerer>,
        retriever: Arc<dyn Retriever>,
        synthesizer: Arc<dyn ResponseSynthesizer>,
    ) -> Self {
        Self {
            classifier,
            enhancer,
            direct,
            retriever,
            synthesizer,
        }
    }

    /// Wire the model-backed workers to one generation backend.
    pub fn with_generator(generator: Arc<dyn TextGenerator>, retriever: Arc<dyn Retriever>) -> Self {
        info!(
            backend = generator.name(),
            retrieval = %retriever.mode(),
            "Supervisor initialized"
        );
        Self::new(
            Arc::new(LlmDifficultyClassifier::new(generator.clone())),
            Arc::new(LlmPromptEnhancer::new(generator.clone())),
            Arc::new(LlmDirectAnswerer::new(generator.clone())),
            retriever,
            Arc::new(LlmResponseSynthesizer::new(generator)),
        )
    }

    pub fn retrieval_mode(&self) -> RetrievalMode {
        self.retriever.mode()
    }

    /// Run the pipeline for `query`. Never fails.
    pub async fn run(&self, query: &str) -> PipelineResult {
        self.run_observed(query, &NoopObserver).await
    }

    /// Run the pipeline, reporting each step transition to `observer`.
    pub async fn run_observed(&self, query: &str, observer: &dyn StepObserver) -> PipelineResult {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", %run_id);

        async move {
            info!(query_len = query.len(), "Pipeline started");
            let mut log = StepLog::new(observer);

            match self.drive(query, &mut log).await {
                Ok(Conclusion::Direct { answer, confidence }) => {
                    let steps = log.into_steps();
                    info!(steps = steps.len(), "Pipeline finished with a direct answer");
                    PipelineResult::direct(&answer, confidence, steps)
                }
                Ok(Conclusion::Synthesized(answer)) => {
                    let steps = log.into_steps();
                    info!(steps = steps.len(), "Pipeline finished");
                    PipelineResult::synthesized(answer, steps)
                }
                Err(e) => {
                    error!(error = %e, steps = log.len(), "Pipeline failed, returning degraded result");
                    PipelineResult::degraded(log.into_steps())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, query: &str, log: &mut StepLog<'_>) -> Result<Conclusion, AgentError> {
        let assessment = stage(log, CLASSIFY_STEP, self.classifier.classify(query))
            .await?
            .into_value();
        debug!(
            level = assessment.level_label(),
            needs_enhancement = ?assessment.needs_enhancement,
            "Difficulty assessed"
        );

        let context = if assessment.wants_enhancement() {
            stage(log, ENHANCE_STEP, self.enhancer.enhance(query))
                .await?
                .into_value()
        } else {
            debug!("Skipping enhancement");
            EnhancedContext::from_raw(query)
        };

        let decision = stage(
            log,
            DIRECT_ANSWER_STEP,
            self.direct
                .decide(query, &context.intent, assessment.level_label()),
        )
        .await?
        .into_value();

        if let Some(answer) = decision.direct_answer() {
            return Ok(Conclusion::Direct {
                answer: answer.to_string(),
                confidence: decision.confidence,
            });
        }

        let retrieval = stage(log, RETRIEVAL_STEP, async {
            Ok(self
                .retriever
                .retrieve(&context.enhanced_prompt, &context.keywords)
                .await)
        })
        .await?
        .into_value();

        let answer = stage(
            log,
            SYNTHESIS_STEP,
            self.synthesizer.synthesize(
                query,
                &context.enhanced_prompt,
                &retrieval.relevant_info_text,
                &context.intent,
            ),
        )
        .await?
        .into_value();

        Ok(Conclusion::Synthesized(answer))
    }
}

/// Record one stage in the log around `work`.
async fn stage<T, F>(
    log: &mut StepLog<'_>,
    description: &str,
    work: F,
) -> Result<Outcome<T>, AgentError>
where
    T: Serialize,
    F: Future<Output = Result<Outcome<T>, AgentError>>,
{
    let ticket = log.begin(description);
    match work.await {
        Ok(outcome) => {
            log.complete(ticket, &outcome);
            Ok(outcome)
        }
        Err(e) => {
            log.fail(ticket, &e);
            Err(e)
        }
    }
}
