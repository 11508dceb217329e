//! Outbound provider adapters.
//!
//! Every third-party dependency of the pipeline sits behind one of these
//! traits so vendors can be swapped without touching orchestration code.
//! Each adapter reports success/failure with a retryability class, and AI
//! calls report token usage for cost accounting.

mod chat;
mod retry;
mod scrape;
mod search;
mod transcription;
mod video;

pub use chat::{ChatClient, ChatConfig};
pub use retry::{with_retry, RetryPolicy};
pub use scrape::{ScrapeClient, ScrapeConfig};
pub use search::{SearchClient, SearchConfig};
pub use transcription::{TranscriptionClient, TranscriptionConfig};
pub use video::{TranscriptClient, VideoConfig, VideoMetadataClient};

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Retryability classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// 5xx, network, or timeout; retried with standard backoff.
    Transient,
    /// 429; retried with a longer backoff multiplier.
    RateLimited,
    /// 4xx (except 429) or bad input; fails immediately.
    NonRetryable,
    /// Malformed structured output; retried like a transient failure.
    Parse,
}

/// Errors from any outbound provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("connection error: {0}")]
    Connection(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("missing credentials for {0}")]
    Credentials(&'static str),
}

impl ProviderError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Http { status: 429, .. } => ErrorClass::RateLimited,
            Self::Http { status, .. } if (400..500).contains(status) => ErrorClass::NonRetryable,
            Self::Http { .. } | Self::Connection(_) | Self::Timeout(_) => ErrorClass::Transient,
            Self::Parse(_) => ErrorClass::Parse,
            Self::Credentials(_) => ErrorClass::NonRetryable,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() != ErrorClass::NonRetryable
    }

    /// Convert a reqwest failure, distinguishing timeouts.
    pub(crate) fn from_reqwest(e: reqwest::Error, budget: Duration) -> Self {
        if e.is_timeout() {
            Self::Timeout(budget)
        } else {
            Self::Connection(e.to_string())
        }
    }
}

/// A chat-completion request to the AI provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Request strict JSON output from the model.
    pub json_mode: bool,
}

/// Token accounting for one AI call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }

    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A chat-completion response.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub usage: TokenUsage,
}

/// AI completion provider (chat-completion style, JSON-mode capable).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest,
        budget: Duration,
    ) -> Result<CompletionResponse, ProviderError>;
}

/// One web search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Web search provider.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        budget: Duration,
    ) -> Result<Vec<SearchHit>, ProviderError>;
}

/// Metadata for a video source.
#[derive(Debug, Clone, Default)]
pub struct VideoMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub duration_secs: Option<i64>,
    pub view_count: Option<i64>,
}

/// Video metadata provider.
#[async_trait]
pub trait VideoMetadataProvider: Send + Sync {
    async fn metadata(&self, url: &str, budget: Duration)
        -> Result<VideoMetadata, ProviderError>;
}

/// One timed transcript segment.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptSegment {
    /// Offset from the start of the media, in seconds.
    pub start_secs: f64,
    pub text: String,
}

/// Video transcript provider.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    async fn transcript(
        &self,
        url: &str,
        budget: Duration,
    ) -> Result<Vec<TranscriptSegment>, ProviderError>;
}

/// A scraped web page.
#[derive(Debug, Clone)]
pub struct ScrapedPage {
    pub title: Option<String>,
    pub text: String,
}

/// Article/document/short-post scrape provider.
#[async_trait]
pub trait ScrapeProvider: Send + Sync {
    async fn scrape(&self, url: &str, budget: Duration) -> Result<ScrapedPage, ProviderError>;
}

/// Podcast transcription provider: submit-and-webhook, never polled.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Submit a transcription job; returns the provider's job id.
    async fn submit(
        &self,
        audio_url: &str,
        callback_url: Option<&str>,
        budget: Duration,
    ) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert_eq!(
            ProviderError::Http { status: 429, message: String::new() }.class(),
            ErrorClass::RateLimited
        );
        assert_eq!(
            ProviderError::Http { status: 404, message: String::new() }.class(),
            ErrorClass::NonRetryable
        );
        assert_eq!(
            ProviderError::Http { status: 500, message: String::new() }.class(),
            ErrorClass::Transient
        );
        assert_eq!(
            ProviderError::Timeout(Duration::from_secs(1)).class(),
            ErrorClass::Transient
        );
        assert_eq!(ProviderError::Parse("x".to_string()).class(), ErrorClass::Parse);
        assert_eq!(ProviderError::Credentials("ai").class(), ErrorClass::NonRetryable);
        assert!(!ProviderError::Credentials("ai").is_retryable());
    }

    #[test]
    fn test_token_usage_accumulates() {
        let mut usage = TokenUsage::default();
        usage.add(TokenUsage { prompt_tokens: 10, completion_tokens: 5 });
        usage.add(TokenUsage { prompt_tokens: 1, completion_tokens: 2 });
        assert_eq!(usage.total(), 18);
    }
}
