//! Route handler functions for all API endpoints.
//!
//! Chat handlers validate the transcript and hand it to the Supervisor. The
//! pipeline itself never fails, so a valid request always gets a 200.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

use askline_core::types::{PipelineResult, ProcessingStep, SearchStatus};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

/// Request body for the chat endpoints.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub transcript: Option<String>,
}

impl ChatRequest {
    /// The transcript, rejecting a missing or blank one.
    fn into_transcript(self) -> Result<String, ApiError> {
        match self.transcript {
            Some(t) if !t.trim().is_empty() => Ok(t),
            Some(_) => Err(ApiError::BadRequest(
                "'transcript' must not be empty".to_string(),
            )),
            None => Err(ApiError::BadRequest(
                "'transcript' is required".to_string(),
            )),
        }
    }
}

/// Response for POST /api/chat.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
    pub processing_steps: Vec<ProcessingStep>,
    pub confidence: f64,
    pub follow_up_suggestions: Vec<String>,
}

impl From<PipelineResult> for ChatResponse {
    fn from(result: PipelineResult) -> Self {
        Self {
            success: true,
            response: result.final_response,
            processing_steps: result.steps,
            confidence: result.confidence,
            follow_up_suggestions: result.follow_up_suggestions,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub retrieval_mode: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        retrieval_mode: state.supervisor.retrieval_mode().to_string(),
    })
}

/// POST /api/chat - run the pipeline and return the full result.
pub async fn process_query(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = body?;
    let transcript = request.into_transcript()?;

    let result = state.supervisor.run(&transcript).await;
    Ok(Json(ChatResponse::from(result)))
}

/// POST /api/chat/stream - run the pipeline, streaming step transitions.
///
/// Emits one `step` event per transition, then a single `result` event
/// carrying the PipelineResult.
pub async fn process_query_stream(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>> + Send>, ApiError> {
    let Json(request) = body?;
    let transcript = request.into_transcript()?;

    let (step_tx, step_rx) = mpsc::unbounded_channel::<ProcessingStep>();
    let (result_tx, result_rx) = mpsc::unbounded_channel::<PipelineResult>();
    let supervisor = state.supervisor.clone();

    tokio::spawn(async move {
        let result = supervisor.run_observed(&transcript, &step_tx).await;
        drop(step_tx);
        let _ = result_tx.send(result);
    });

    let steps = UnboundedReceiverStream::new(step_rx)
        .map(|step| Ok::<_, Infallible>(sse_event("step", &step)));
    let result = UnboundedReceiverStream::new(result_rx)
        .map(|result| Ok::<_, Infallible>(sse_event("result", &result)));

    Ok(Sse::new(steps.chain(result))
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

/// GET /api/search/status - which search credentials are configured.
pub async fn search_status(State(state): State<AppState>) -> Json<SearchStatus> {
    Json(state.search_status.clone())
}

fn sse_event<T: Serialize>(name: &str, payload: &T) -> Event {
    let data = serde_json::to_string(payload).unwrap_or_default();
    Event::default().event(name).data(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_validation() {
        let ok = ChatRequest {
            transcript: Some("hello".to_string()),
        };
        assert_eq!(ok.into_transcript().unwrap(), "hello");

        let blank = ChatRequest {
            transcript: Some(" \n\t".to_string()),
        };
        assert!(matches!(blank.into_transcript(), Err(ApiError::BadRequest(_))));

        let missing = ChatRequest { transcript: None };
        assert!(matches!(missing.into_transcript(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_chat_response_wire_names() {
        let result = PipelineResult::degraded(vec![]);
        let json = serde_json::to_value(ChatResponse::from(result)).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("processingSteps").is_some());
        assert!(json.get("followUpSuggestions").is_some());
        assert_eq!(json["confidence"], 0.3);
    }
}
