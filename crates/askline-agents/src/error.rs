//! Error types for the agent pipeline.

use askline_core::error::AsklineError;

/// Errors raised inside a worker or backend client.
///
/// Model-backed workers convert these into fallback values before they
/// reach the Supervisor; an `AgentError` that escapes a worker aborts the
/// run with the degraded result.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("empty response from backend")]
    EmptyResponse,
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid output: {0}")]
    Invalid(String),
    #[error("worker failed: {0}")]
    Worker(String),
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::Request(err.to_string())
    }
}

impl From<AsklineError> for AgentError {
    fn from(err: AsklineError) -> Self {
        match err {
            AsklineError::MissingCredential(name) => AgentError::MissingCredential(name),
            other => AgentError::Config(other.to_string()),
        }
    }
}
