use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AsklineError, Result};
use crate::types::SearchStatus;

/// Environment variable holding the text-generation API key.
pub const LLM_API_KEY_ENV: &str = "GOOGLE_API_KEY";
/// Environment variable holding the search API key.
pub const SEARCH_API_KEY_ENV: &str = "GOOGLE_SEARCH_API_KEY";
/// Environment variable holding the search engine identifier.
pub const SEARCH_ENGINE_ID_ENV: &str = "GOOGLE_SEARCH_ENGINE_ID";
/// Environment variable overriding the API server port.
pub const PORT_ENV: &str = "ASKLINE_PORT";

/// Model-backed stages in the longest pipeline path.
const MODEL_CALLS_PER_RUN: u64 = 4;

/// Top-level configuration for Askline.
///
/// Loaded from `~/.askline/config.toml` by default. Credentials may live in
/// the file, but the environment wins when both are set. The configuration
/// is read once at startup and never mutated afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AsklineConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl AsklineConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AsklineConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AsklineError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Worst-case seconds one pipeline run can spend waiting on backends:
    /// four model calls and one search request, each at its own timeout.
    pub fn pipeline_budget_secs(&self) -> u64 {
        MODEL_CALLS_PER_RUN * self.llm.timeout_secs + self.search.timeout_secs
    }

    /// Whether the HTTP request timeout leaves room for every worker to
    /// reach its fallback before the request is cut off.
    pub fn request_timeout_covers_pipeline(&self) -> bool {
        self.general.request_timeout_secs > self.pipeline_budget_secs()
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Empty values are ignored so an exported-but-blank variable does not
    /// shadow a credential from the config file.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(LLM_API_KEY_ENV) {
            self.llm.api_key = Some(key);
        }
        if let Some(key) = non_empty(SEARCH_API_KEY_ENV) {
            self.search.api_key = Some(key);
        }
        if let Some(id) = non_empty(SEARCH_ENGINE_ID_ENV) {
            self.search.engine_id = Some(id);
        }
        if let Some(port) = non_empty(PORT_ENV) {
            match port.parse::<u16>() {
                Ok(p) => self.general.port = p,
                Err(_) => warn!(value = %port, "Ignoring invalid {}", PORT_ENV),
            }
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// API server port.
    pub port: u16,
    /// Upper bound on a single HTTP request, pipeline included. Keep it above
    /// [`AsklineConfig::pipeline_budget_secs`].
    pub request_timeout_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            port: 3040,
            request_timeout_secs: 150,
        }
    }
}

/// Text-generation backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the generative-language API.
    pub endpoint: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens in a single completion.
    pub max_output_tokens: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// API key. Required at startup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
            temperature: 0.7,
            max_output_tokens: 2048,
            timeout_secs: 30,
            api_key: None,
        }
    }
}

impl LlmConfig {
    /// The configured API key, or a hard error when absent.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AsklineError::MissingCredential(LLM_API_KEY_ENV))
    }
}

/// Web search backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Custom Search JSON API endpoint.
    pub endpoint: String,
    /// Maximum hits requested per query.
    pub max_results: u32,
    /// Language restriction, e.g. "lang_en".
    pub language: String,
    /// Safe-search level: "active" or "off".
    pub safe_search: String,
    /// Optional country restriction, e.g. "countryUS".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Maximum characters of the cleaned prompt appended to the query.
    pub query_char_limit: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_id: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.googleapis.com/customsearch/v1".to_string(),
            max_results: 5,
            language: "lang_en".to_string(),
            safe_search: "active".to_string(),
            region: None,
            query_char_limit: 100,
            timeout_secs: 10,
            api_key: None,
            engine_id: None,
        }
    }
}

impl SearchConfig {
    /// Both search credentials, when present and non-blank.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let key = self.api_key.as_deref().filter(|k| !k.trim().is_empty())?;
        let id = self.engine_id.as_deref().filter(|i| !i.trim().is_empty())?;
        Some((key, id))
    }

    /// Whether live search is available.
    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }

    /// Report which search credentials are present.
    pub fn status(&self) -> SearchStatus {
        let configured = self.is_configured();
        SearchStatus {
            configured,
            has_api_key: self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()),
            has_engine_id: self
                .engine_id
                .as_deref()
                .is_some_and(|i| !i.trim().is_empty()),
            message: if configured {
                "Search API configured - using live results".to_string()
            } else {
                "Search API not configured - using simulated results".to_string()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AsklineConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.port, 3040);
        assert_eq!(config.general.request_timeout_secs, 150);
        assert_eq!(config.llm.model, "gemini-2.0-flash-exp");
        assert_eq!(config.llm.max_output_tokens, 2048);
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.search.safe_search, "active");
        assert_eq!(config.search.query_char_limit, 100);
        assert!(config.llm.api_key.is_none());
        assert!(!config.search.is_configured());
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[general]
log_level = "debug"

[search]
language = "lang_pt"
region = "countryBR"
"#;
        let file = create_temp_config(content);
        let config = AsklineConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.port, 3040);
        assert_eq!(config.search.language, "lang_pt");
        assert_eq!(config.search.region.as_deref(), Some("countryBR"));
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.llm.model, "gemini-2.0-flash-exp");
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        assert!(AsklineConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = AsklineConfig::load(Path::new("/nonexistent/askline.toml")).unwrap_err();
        assert!(matches!(err, AsklineError::Io(_)));
    }

    #[test]
    fn test_default_request_timeout_outlasts_pipeline() {
        let config = AsklineConfig::default();
        assert_eq!(config.pipeline_budget_secs(), 4 * 30 + 10);
        assert!(config.request_timeout_covers_pipeline());
    }

    #[test]
    fn test_short_request_timeout_is_detected() {
        let mut config = AsklineConfig::default();
        config.general.request_timeout_secs = config.llm.timeout_secs;
        assert!(!config.request_timeout_covers_pipeline());

        config.llm.timeout_secs = 5;
        config.search.timeout_secs = 5;
        assert!(config.request_timeout_covers_pipeline());
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        let mut config = AsklineConfig::default();
        config.general.port = 4000;
        config.search.engine_id = Some("engine".to_string());
        config.save(&path).unwrap();

        let reloaded = AsklineConfig::load(&path).unwrap();
        assert_eq!(reloaded.general.port, 4000);
        assert_eq!(reloaded.search.engine_id.as_deref(), Some("engine"));
        assert!(reloaded.search.api_key.is_none());
    }

    #[test]
    fn test_env_overrides_credentials_and_port() {
        let mut config = AsklineConfig::default();
        config.apply_overrides_from(env_of(&[
            (LLM_API_KEY_ENV, "llm-key"),
            (SEARCH_API_KEY_ENV, "search-key"),
            (SEARCH_ENGINE_ID_ENV, "cx-id"),
            (PORT_ENV, "8081"),
        ]));
        assert_eq!(config.llm.require_api_key().unwrap(), "llm-key");
        assert_eq!(config.search.credentials(), Some(("search-key", "cx-id")));
        assert_eq!(config.general.port, 8081);
    }

    #[test]
    fn test_blank_env_does_not_shadow_file_value() {
        let mut config = AsklineConfig::default();
        config.llm.api_key = Some("from-file".to_string());
        config.apply_overrides_from(env_of(&[(LLM_API_KEY_ENV, "  ")]));
        assert_eq!(config.llm.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_invalid_port_env_is_ignored() {
        let mut config = AsklineConfig::default();
        config.apply_overrides_from(env_of(&[(PORT_ENV, "not-a-port")]));
        assert_eq!(config.general.port, 3040);
    }

    #[test]
    fn test_missing_llm_key_is_an_error() {
        let config = LlmConfig::default();
        let err = config.require_api_key().unwrap_err();
        assert!(matches!(err, AsklineError::MissingCredential(LLM_API_KEY_ENV)));
    }

    #[test]
    fn test_search_requires_both_credentials() {
        let mut search = SearchConfig {
            api_key: Some("key".to_string()),
            ..SearchConfig::default()
        };
        assert!(!search.is_configured());

        let status = search.status();
        assert!(!status.configured);
        assert!(status.has_api_key);
        assert!(!status.has_engine_id);
        assert!(status.message.contains("simulated"));

        search.engine_id = Some("cx".to_string());
        let status = search.status();
        assert!(status.configured);
        assert!(status.message.contains("live"));
    }
}
