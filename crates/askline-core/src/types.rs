use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Confidence assumed when a worker omits it.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;
/// Confidence reported by a worker that fell back to its default.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;
/// Confidence of the degraded result after a pipeline-level failure.
pub const DEGRADED_CONFIDENCE: f64 = 0.3;

pub const DEGRADED_RESPONSE: &str =
    "Sorry, something went wrong while processing your question. Please try again.";
pub const DEGRADED_SUGGESTIONS: [&str; 2] = ["Try again", "Check your connection"];

pub const SYNTHESIS_FALLBACK_RESPONSE: &str =
    "Sorry, I had trouble processing your question right now. Could you try rephrasing it?";
pub const SYNTHESIS_FALLBACK_SUGGESTIONS: [&str; 2] = [
    "Try asking a more specific question",
    "Rephrase your question",
];

/// Follow-ups offered when the direct-answer fast path ends the run.
pub const DIRECT_ANSWER_SUGGESTIONS: [&str; 2] = ["Want to know more?", "Any specific doubt?"];

pub const SIMPLE_INTENT: &str = "simple question";
pub const GENERAL_INTENT: &str = "general information";

/// Clamp a confidence score into [0, 1]; non-finite values become the default.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        DEFAULT_CONFIDENCE
    }
}

/// The first `n` whitespace-delimited tokens of `text`.
pub fn leading_tokens(text: &str, n: usize) -> Vec<String> {
    text.split_whitespace().take(n).map(str::to_string).collect()
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Difficulty
// =============================================================================

/// How hard a query is to answer well.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    /// Direct, factual, basic concepts.
    Simple,
    /// Needs explanation or extra context.
    Medium,
    /// Technical, multi-faceted, or research-heavy.
    Complex,
}

impl DifficultyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Simple => "simple",
            DifficultyLevel::Medium => "medium",
            DifficultyLevel::Complex => "complex",
        }
    }

    /// Parse a level label, ignoring case and surrounding whitespace.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "simple" => Some(DifficultyLevel::Simple),
            "medium" => Some(DifficultyLevel::Medium),
            "complex" => Some(DifficultyLevel::Complex),
            _ => None,
        }
    }
}

impl std::fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the difficulty classifier.
///
/// `level` and `needs_enhancement` are forwarded exactly as the model
/// reported them; `None` means the model left the field out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyAssessment {
    pub level: Option<DifficultyLevel>,
    pub needs_enhancement: Option<bool>,
    pub reasoning: String,
    pub confidence: f64,
}

impl DifficultyAssessment {
    /// Assessment used when classification fails.
    pub fn fallback() -> Self {
        Self {
            level: Some(DifficultyLevel::Medium),
            needs_enhancement: Some(true),
            reasoning: "Difficulty analysis failed, assuming medium difficulty".to_string(),
            confidence: FALLBACK_CONFIDENCE,
        }
    }

    /// Whether the enhancer should run. An unreported flag means yes.
    pub fn wants_enhancement(&self) -> bool {
        self.needs_enhancement.unwrap_or(true)
    }

    /// Level label handed to downstream prompts.
    pub fn level_label(&self) -> &'static str {
        self.level.map(|l| l.as_str()).unwrap_or("unknown")
    }
}

// =============================================================================
// Enhancement
// =============================================================================

/// Search-ready restatement of the user's query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedContext {
    pub enhanced_prompt: String,
    pub intent: String,
    pub keywords: Vec<String>,
}

impl EnhancedContext {
    /// Context built from the raw query when enhancement is skipped.
    pub fn from_raw(query: &str) -> Self {
        Self {
            enhanced_prompt: query.to_string(),
            intent: SIMPLE_INTENT.to_string(),
            keywords: leading_tokens(query, 3),
        }
    }

    /// Context used when the enhancer fails.
    pub fn fallback(query: &str) -> Self {
        Self {
            enhanced_prompt: query.to_string(),
            intent: GENERAL_INTENT.to_string(),
            keywords: leading_tokens(query, 5),
        }
    }
}

// =============================================================================
// Direct answer
// =============================================================================

/// Whether internal knowledge is enough to answer without searching.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectAnswerDecision {
    pub needs_internet_search: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_response: Option<String>,
    pub search_required: Option<bool>,
    pub reasoning: String,
    pub confidence: f64,
}

impl DirectAnswerDecision {
    /// Decision used when the check fails: prefer retrieval.
    pub fn fallback() -> Self {
        Self {
            needs_internet_search: Some(true),
            direct_response: None,
            search_required: Some(true),
            reasoning: "Direct-answer check failed, assuming a search is needed".to_string(),
            confidence: FALLBACK_CONFIDENCE,
        }
    }

    /// The answer to return immediately, if the run may end here.
    ///
    /// Requires an explicit `needs_internet_search = false` and a
    /// non-blank response.
    pub fn direct_answer(&self) -> Option<&str> {
        if self.needs_internet_search != Some(false) {
            return None;
        }
        self.direct_response
            .as_deref()
            .filter(|r| !r.trim().is_empty())
    }
}

// =============================================================================
// Retrieval
// =============================================================================

/// One search hit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Supporting context gathered for synthesis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResult {
    pub items: Vec<SearchHit>,
    pub relevant_info_text: String,
    pub sources: Vec<String>,
}

impl RetrievalResult {
    /// Build the result and its derived text from an ordered hit list.
    pub fn from_hits(items: Vec<SearchHit>) -> Self {
        let relevant_info_text = items
            .iter()
            .map(|hit| format!("{}: {}", hit.title, hit.snippet))
            .collect::<Vec<_>>()
            .join("\n\n");
        let sources = items.iter().map(|hit| hit.url.clone()).collect();
        Self {
            items,
            relevant_info_text,
            sources,
        }
    }
}

// =============================================================================
// Synthesis
// =============================================================================

/// The conversational answer produced by synthesis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalAnswer {
    pub conversational_response: String,
    pub confidence: f64,
    pub follow_up_suggestions: Vec<String>,
}

impl FinalAnswer {
    /// Answer used when synthesis fails.
    pub fn fallback() -> Self {
        Self {
            conversational_response: SYNTHESIS_FALLBACK_RESPONSE.to_string(),
            confidence: FALLBACK_CONFIDENCE,
            follow_up_suggestions: to_strings(&SYNTHESIS_FALLBACK_SUGGESTIONS),
        }
    }
}

// =============================================================================
// Step log and pipeline result
// =============================================================================

/// Lifecycle of a processing step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Processing,
    Completed,
    Error,
}

/// One entry of the caller-visible step log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStep {
    /// 1-based position in run order.
    pub ordinal: u32,
    pub status: StepStatus,
    pub description: String,
    /// Payload of the stage that produced this step.
    pub result: serde_json::Value,
    /// Set when the stage substituted its fallback value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// The Supervisor's return value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub final_response: String,
    pub steps: Vec<ProcessingStep>,
    pub confidence: f64,
    pub follow_up_suggestions: Vec<String>,
}

impl PipelineResult {
    /// Result of a run that ended on the direct-answer fast path.
    pub fn direct(answer: &str, confidence: f64, steps: Vec<ProcessingStep>) -> Self {
        Self {
            final_response: answer.to_string(),
            steps,
            confidence: clamp_confidence(confidence),
            follow_up_suggestions: to_strings(&DIRECT_ANSWER_SUGGESTIONS),
        }
    }

    /// Result of a run that reached synthesis.
    pub fn synthesized(answer: FinalAnswer, steps: Vec<ProcessingStep>) -> Self {
        Self {
            final_response: answer.conversational_response,
            steps,
            confidence: clamp_confidence(answer.confidence),
            follow_up_suggestions: answer.follow_up_suggestions,
        }
    }

    /// Fixed result after a pipeline-level failure. Partial steps are kept.
    pub fn degraded(steps: Vec<ProcessingStep>) -> Self {
        Self {
            final_response: DEGRADED_RESPONSE.to_string(),
            steps,
            confidence: DEGRADED_CONFIDENCE,
            follow_up_suggestions: to_strings(&DEGRADED_SUGGESTIONS),
        }
    }
}

/// Which search credentials are present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStatus {
    pub configured: bool,
    pub has_api_key: bool,
    pub has_engine_id: bool,
    pub message: String,
}
