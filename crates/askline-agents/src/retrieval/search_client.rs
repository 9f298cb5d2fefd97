use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use askline_core::config::{SearchConfig, SEARCH_API_KEY_ENV};
use askline_core::types::SearchHit;

use crate::error::AgentError;

/// The Custom Search API accepts at most this many results per request.
const MAX_RESULTS_PER_REQUEST: u32 = 10;

/// Hits plus the aggregate metadata the API reports.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub total_results: u64,
    pub search_time: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
    #[serde(default)]
    search_information: Option<CseSearchInformation>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    title: Option<String>,
    snippet: Option<String>,
    link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CseSearchInformation {
    #[serde(default)]
    total_results: Option<Value>,
    #[serde(default)]
    search_time: Option<Value>,
}

/// Numbers arrive as JSON numbers or as strings.
fn lenient_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl From<CseItem> for SearchHit {
    fn from(item: CseItem) -> Self {
        Self {
            title: item.title.unwrap_or_else(|| "title unavailable".to_string()),
            snippet: item
                .snippet
                .unwrap_or_else(|| "snippet unavailable".to_string()),
            url: item.link.unwrap_or_else(|| "#".to_string()),
        }
    }
}

impl From<CseResponse> for SearchResponse {
    fn from(response: CseResponse) -> Self {
        let info = response.search_information.as_ref();
        Self {
            total_results: lenient_f64(info.and_then(|i| i.total_results.as_ref()))
                .map(|n| n.max(0.0) as u64)
                .unwrap_or(0),
            search_time: lenient_f64(info.and_then(|i| i.search_time.as_ref())).unwrap_or(0.0),
            hits: response.items.into_iter().map(SearchHit::from).collect(),
        }
    }
}

/// Client for the Custom Search JSON API.
pub struct CustomSearchClient {
    client: Client,
    endpoint: String,
    api_key: String,
    engine_id: String,
    max_results: u32,
    language: String,
    safe_search: String,
    region: Option<String>,
}

impl CustomSearchClient {
    pub fn from_config(config: &SearchConfig) -> Result<Self, AgentError> {
        let (api_key, engine_id) = config
            .credentials()
            .ok_or(AgentError::MissingCredential(SEARCH_API_KEY_ENV))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: api_key.to_string(),
            engine_id: engine_id.to_string(),
            max_results: config.max_results.clamp(1, MAX_RESULTS_PER_REQUEST),
            language: config.language.clone(),
            safe_search: config.safe_search.clone(),
            region: config.region.clone().filter(|r| !r.trim().is_empty()),
        })
    }

    fn params(&self, query: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("key", self.api_key.clone()),
            ("cx", self.engine_id.clone()),
            ("q", query.to_string()),
            ("num", self.max_results.to_string()),
            ("safe", self.safe_search.clone()),
        ];
        if !self.language.trim().is_empty() {
            params.push(("lr", self.language.clone()));
        }
        if let Some(region) = &self.region {
            params.push(("cr", region.clone()));
        }
        params
    }

    /// Run one search request.
    pub async fn search(&self, query: &str) -> Result<SearchResponse, AgentError> {
        tracing::debug!(query_len = query.len(), num = self.max_results, "Sending search request");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&self.params(query))
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

        let parsed: CseResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Decode(e.to_string()))?;
        let result = SearchResponse::from(parsed);

        tracing::debug!(
            hits = result.hits.len(),
            total = result.total_results,
            search_time = result.search_time,
            "Search completed"
        );
        Ok(result)
    }
}
