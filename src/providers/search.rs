//! Web search client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ProviderError, SearchHit, SearchProvider};

/// Configuration for the web search client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Results requested per query.
    #[serde(default = "default_count")]
    pub result_count: u32,
}

fn default_endpoint() -> String {
    "https://api.search.brave.com/res/v1/web/search".to_string()
}
fn default_count() -> u32 {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            result_count: default_count(),
        }
    }
}

/// HTTP client for web search.
pub struct SearchClient {
    config: SearchConfig,
    client: Client,
}

#[derive(Deserialize)]
struct SearchApiResponse {
    #[serde(default)]
    web: WebResults,
}

#[derive(Deserialize, Default)]
struct WebResults {
    #[serde(default)]
    results: Vec<WebResult>,
}

#[derive(Deserialize)]
struct WebResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    description: String,
}

impl SearchClient {
    pub fn new(config: SearchConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::Connection(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn api_key(&self) -> Result<String, ProviderError> {
        if let Some(key) = &self.config.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        std::env::var("VERISCOPE_SEARCH_API_KEY").map_err(|_| ProviderError::Credentials("search"))
    }
}

#[async_trait]
impl SearchProvider for SearchClient {
    async fn search(&self, query: &str, budget: Duration) -> Result<Vec<SearchHit>, ProviderError> {
        let key = self.api_key()?;
        debug!("web search: {query}");

        let resp = self
            .client
            .get(&self.config.endpoint)
            .header("X-Subscription-Token", key)
            .query(&[("q", query), ("count", &self.config.result_count.to_string())])
            .timeout(budget)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, budget))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                message: crate::utils::truncate_utf8(&message, 500).to_string(),
            });
        }

        let parsed: SearchApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(parsed
            .web
            .results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                snippet: r.description,
            })
            .collect())
    }
}
