//! Text-generation backend.
//!
//! Workers only see the [`TextGenerator`] trait: one prompt in, one text
//! reply out. [`GeminiClient`] implements it against the Gemini
//! `generateContent` REST endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use askline_core::config::LlmConfig;

use crate::error::AgentError;

/// A single-shot text-generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Send one prompt and return the model's text reply.
    async fn generate(&self, prompt: &str) -> Result<String, AgentError>;
}

/// Gemini REST client.
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiClient {
    /// Build a client from configuration.
    ///
    /// Fails when no API key is configured; the generation backend is
    /// mandatory, so callers treat this as a startup error.
    pub fn from_config(config: &LlmConfig) -> Result<Self, AgentError> {
        let api_key = config.require_api_key()?.to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        tracing::info!(model = %config.model, "Gemini client initialized");

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    fn payload(&self, prompt: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens
            }
        })
    }

    /// Concatenate the text parts of the first candidate.
    pub(crate) fn parse_response(json: &Value) -> Result<String, AgentError> {
        let parts = json["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or(AgentError::EmptyResponse)?;

        let text: String = parts
            .iter()
            .filter_map(|part| part["text"].as_str())
            .collect();

        if text.trim().is_empty() {
            return Err(AgentError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Sending generation request");

        let response = self
            .client
            .post(self.url())
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&self.payload(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AgentError::Decode(e.to_string()))?;

        Self::parse_response(&json)
    }
}
