//! Podcast transcription client.
//!
//! Submit-and-webhook only: the pipeline never blocks on transcription.
//! The provider calls back to our webhook endpoint when the job finishes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ProviderError, TranscriptionProvider};

/// Configuration for the transcription client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Public URL of our webhook endpoint, passed to the provider.
    #[serde(default)]
    pub callback_url: Option<String>,
}

fn default_endpoint() -> String {
    "https://api.assemblyai.com/v2/transcript".to_string()
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            callback_url: None,
        }
    }
}

/// HTTP client for submitting transcription jobs.
pub struct TranscriptionClient {
    config: TranscriptionConfig,
    client: Client,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    audio_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    webhook_url: Option<&'a str>,
}

#[derive(Deserialize)]
struct SubmitResponse {
    id: String,
}

impl TranscriptionClient {
    pub fn new(config: TranscriptionConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::Connection(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn callback_url(&self) -> Option<&str> {
        self.config.callback_url.as_deref()
    }

    fn api_key(&self) -> Result<String, ProviderError> {
        if let Some(key) = &self.config.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        std::env::var("VERISCOPE_TRANSCRIPTION_API_KEY")
            .map_err(|_| ProviderError::Credentials("transcription"))
    }
}

#[async_trait]
impl TranscriptionProvider for TranscriptionClient {
    async fn submit(
        &self,
        audio_url: &str,
        callback_url: Option<&str>,
        budget: Duration,
    ) -> Result<String, ProviderError> {
        let key = self.api_key()?;
        debug!("submitting transcription job for {audio_url}");

        let body = SubmitRequest {
            audio_url,
            webhook_url: callback_url.or(self.config.callback_url.as_deref()),
        };
        let resp = self
            .client
            .post(&self.config.endpoint)
            .header("authorization", key)
            .timeout(budget)
            .json(&body)
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

        let parsed: SubmitResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(parsed.id)
    }
}
