//! Video metadata and transcript clients.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    ProviderError, TranscriptProvider, TranscriptSegment, VideoMetadata, VideoMetadataProvider,
};

/// Configuration for the video providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Metadata API endpoint; receives `?url=<video url>`.
    #[serde(default = "default_metadata_endpoint")]
    pub metadata_endpoint: String,
    /// Transcript API endpoint; receives `?url=<video url>`.
    #[serde(default = "default_transcript_endpoint")]
    pub transcript_endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_metadata_endpoint() -> String {
    "https://api.supadata.ai/v1/youtube/video".to_string()
}
fn default_transcript_endpoint() -> String {
    "https://api.supadata.ai/v1/youtube/transcript".to_string()
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            metadata_endpoint: default_metadata_endpoint(),
            transcript_endpoint: default_transcript_endpoint(),
            api_key: None,
        }
    }
}

fn api_key(config: &VideoConfig) -> Result<String, ProviderError> {
    if let Some(key) = &config.api_key {
        if !key.is_empty() {
            return Ok(key.clone());
        }
    }
    std::env::var("VERISCOPE_VIDEO_API_KEY").map_err(|_| ProviderError::Credentials("video"))
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(ProviderError::Http {
        status: status.as_u16(),
        message: crate::utils::truncate_utf8(&message, 500).to_string(),
    })
}

/// Video metadata client.
pub struct VideoMetadataClient {
    config: VideoConfig,
    client: Client,
}

#[derive(Deserialize)]
struct MetadataResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "channel")]
    author: Option<String>,
    #[serde(default, alias = "duration")]
    duration_secs: Option<i64>,
    #[serde(default, alias = "viewCount")]
    view_count: Option<i64>,
}

impl VideoMetadataClient {
    pub fn new(config: VideoConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::Connection(e.to_string()))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl VideoMetadataProvider for VideoMetadataClient {
    async fn metadata(&self, url: &str, budget: Duration) -> Result<VideoMetadata, ProviderError> {
        let key = api_key(&self.config)?;
        debug!("video metadata: {url}");
        let resp = self
            .client
            .get(&self.config.metadata_endpoint)
            .header("x-api-key", key)
            .query(&[("url", url)])
            .timeout(budget)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, budget))?;
        let resp = check_status(resp).await?;
        let parsed: MetadataResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(VideoMetadata {
            title: parsed.title,
            author: parsed.author,
            duration_secs: parsed.duration_secs,
            view_count: parsed.view_count,
        })
    }
}

/// Video transcript client.
pub struct TranscriptClient {
    config: VideoConfig,
    client: Client,
}

#[derive(Deserialize)]
struct TranscriptResponse {
    #[serde(default, alias = "content")]
    segments: Vec<RawSegment>,
}

#[derive(Deserialize)]
struct RawSegment {
    /// Offset in milliseconds.
    #[serde(default, alias = "offset")]
    start_ms: f64,
    #[serde(default)]
    text: String,
}

impl TranscriptClient {
    pub fn new(config: VideoConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::Connection(e.to_string()))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl TranscriptProvider for TranscriptClient {
    async fn transcript(
        &self,
        url: &str,
        budget: Duration,
    ) -> Result<Vec<TranscriptSegment>, ProviderError> {
        let key = api_key(&self.config)?;
        debug!("video transcript: {url}");
        let resp = self
            .client
            .get(&self.config.transcript_endpoint)
            .header("x-api-key", key)
            .query(&[("url", url)])
            .timeout(budget)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, budget))?;
        let resp = check_status(resp).await?;
        let parsed: TranscriptResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(parsed
            .segments
            .into_iter()
            .filter(|s| !s.text.is_empty())
            .map(|s| TranscriptSegment {
                start_secs: s.start_ms / 1000.0,
                text: s.text,
            })
            .collect())
    }
}
