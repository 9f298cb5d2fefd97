//! Structured-output decoding for model replies.
//!
//! Every model-backed worker asks for a single JSON object. Replies often
//! arrive wrapped in markdown code fences or with a sentence of prose around
//! the object, so decoding is: strip fences, parse, fall back to the
//! outermost `{...}` span, then validate the typed payload.

use serde::de::DeserializeOwned;
use serde_json::Value;

use askline_core::types::{clamp_confidence, DEFAULT_CONFIDENCE};

use crate::error::AgentError;

/// A JSON payload a worker expects from the model.
pub trait StructuredOutput: DeserializeOwned {
    /// Reject payloads that parse but are unusable.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Remove a surrounding ``` fence (with or without a language tag).
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// The outermost `{...}` span of `text`, if any.
fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Parse `text` as JSON, retrying on its outermost `{...}` span when the
/// whole text does not parse.
fn parse_lenient(text: &str) -> Result<Value, AgentError> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(first) => match object_span(text) {
            Some(span) if span.len() < text.len() => {
                serde_json::from_str(span).map_err(|e| AgentError::Decode(e.to_string()))
            }
            _ => Err(AgentError::Decode(first.to_string())),
        },
    }
}

/// Decode a model reply into `T`.
///
/// The reply must hold a single JSON object. Arrays and scalars are rejected
/// before field mapping, since serde would otherwise accept a sequence for a
/// struct.
pub fn decode<T: StructuredOutput>(raw: &str) -> Result<T, AgentError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(AgentError::EmptyResponse);
    }

    let object = match parse_lenient(body)? {
        object @ Value::Object(_) => object,
        _ => return Err(AgentError::Decode("expected a JSON object".to_string())),
    };

    let value: T = serde_json::from_value(object).map_err(|e| AgentError::Decode(e.to_string()))?;
    value.validate().map_err(AgentError::Invalid)?;
    Ok(value)
}

/// Confidence from an optional field: absent means the default, and the
/// result is always within [0, 1].
pub fn confidence_or_default(value: Option<f64>) -> f64 {
    clamp_confidence(value.unwrap_or(DEFAULT_CONFIDENCE))
}

/// Require a non-blank string field.
pub fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("field '{}' must not be empty", field))
    } else {
        Ok(())
    }
}
