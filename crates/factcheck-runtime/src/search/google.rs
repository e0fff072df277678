//! Google Programmable Search (Custom Search JSON API).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;

use factcheck_core::EvidenceItem;

use super::{SearchError, SearchProvider};
use crate::config::MAX_RESULT_CAP;
use crate::providers::{ApiCredential, CredentialBuilder, ProviderError};

pub const GOOGLE_API_KEY_ENVS: &[&str] = &["GOOGLE_SEARCH_API_KEY"];
pub const SEARCH_ENGINE_ID_ENVS: &[&str] = &["CUSTOM_SEARCH_ENGINE_ID"];
pub const GOOGLE_ENDPOINT_ENV: &str = "GOOGLE_SEARCH_ENDPOINT";

const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

pub struct GoogleSearchProvider {
    api_key: ApiCredential,
    engine_id: ApiCredential,
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for GoogleSearchProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSearchProvider")
            .field("api_key", &self.api_key)
            .field("engine_id", &self.engine_id)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl GoogleSearchProvider {
    /// Build from `api_key` / `engine_id` / `endpoint` config keys, falling
    /// back to `GOOGLE_SEARCH_API_KEY`, `CUSTOM_SEARCH_ENGINE_ID` and
    /// `GOOGLE_SEARCH_ENDPOINT`.
    pub fn from_config(config: &JsonValue) -> Result<Self, SearchError> {
        let mut creds = CredentialBuilder::new()
            .require("api_key", GOOGLE_API_KEY_ENVS, "Google search API key")
            .require("engine_id", SEARCH_ENGINE_ID_ENVS, "Custom search engine id")
            .build(config)
            .map_err(not_configured)?;

        let endpoint = config["endpoint"]
            .as_str()
            .map(str::to_string)
            .or_else(|| std::env::var(GOOGLE_ENDPOINT_ENV).ok())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        Ok(Self {
            api_key: creds.take("api_key").map_err(not_configured)?,
            engine_id: creds.take("engine_id").map_err(not_configured)?,
            endpoint,
            timeout: Duration::from_secs(10),
            client: reqwest::Client::new(),
        })
    }

    pub fn from_env() -> Result<Self, SearchError> {
        Self::from_config(&JsonValue::Null)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn not_configured(err: ProviderError) -> SearchError {
    SearchError::NotConfigured(err.to_string())
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    // Absent when the query has no matches
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl SearchProvider for GoogleSearchProvider {
    async fn search(&self, query: &str, num: usize) -> Result<Vec<EvidenceItem>, SearchError> {
        let num = num.clamp(1, MAX_RESULT_CAP).to_string();

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.expose()),
                ("cx", self.engine_id.expose()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout(self.timeout)
                } else {
                    // Strip the URL: it carries the API key as a query parameter
                    SearchError::HttpError(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(SearchError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::ParseError(e.without_url().to_string()))?;

        Ok(body
            .items
            .into_iter()
            .map(|item| EvidenceItem::new(item.title, item.snippet, item.link))
            .collect())
    }

    fn name(&self) -> &str {
        "google"
    }
}
