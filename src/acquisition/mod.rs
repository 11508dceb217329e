//! Acquisition adapters: turn a URL into normalized text + metadata.
//!
//! Each source type has its own fetch policy. Failures are classified and
//! recorded on the content item as a sentinel (see `models::content`)
//! rather than raised, so the pipeline yields a partial-success result
//! the caller can explain to the user.

mod article;
mod podcast;
mod shortpost;
mod video;

pub use video::render_transcript;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::models::{ContentItem, FailureCategory, SourceType};
use crate::providers::{
    ProviderError, RetryPolicy, ScrapeProvider, TranscriptProvider, TranscriptionProvider,
    VideoMetadataProvider,
};
use crate::utils::Deadline;

/// Result of one acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Text and metadata are on the item.
    Acquired { paywall_warning: bool },
    /// A transcription job was submitted; the webhook resumes later.
    Transcribing { job_id: String },
    /// Classified failure; the sentinel is on the item.
    Failed(FailureCategory),
}

/// Per-source-type content fetcher.
pub struct Acquirer {
    pub video_metadata: Arc<dyn VideoMetadataProvider>,
    pub transcripts: Arc<dyn TranscriptProvider>,
    pub scraper: Arc<dyn ScrapeProvider>,
    pub transcription: Arc<dyn TranscriptionProvider>,
    pub retry: RetryPolicy,
    pub call_timeout: Duration,
}

impl Acquirer {
    /// Fetch content for an item, mutating it in place.
    ///
    /// On failure the item's `full_text` carries the failure sentinel and
    /// the outcome names the category.
    pub async fn acquire(
        &self,
        item: &mut ContentItem,
        deadline: Deadline,
        transcription_callback: Option<&str>,
    ) -> AcquireOutcome {
        info!("acquiring {} content from {}", item.source_type.as_str(), item.url);
        let outcome = match item.source_type {
            SourceType::Video => video::acquire(self, item, deadline).await,
            SourceType::Article | SourceType::Document => {
                article::acquire(self, item, deadline).await
            }
            SourceType::ShortPost => shortpost::acquire(self, item, deadline).await,
            SourceType::Podcast => {
                podcast::acquire(self, item, deadline, transcription_callback).await
            }
        };
        if let AcquireOutcome::Failed(category) = &outcome {
            item.mark_failed(*category);
        }
        outcome
    }
}

/// Map a provider failure to a user-explainable acquisition category.
pub(crate) fn classify_failure(error: &ProviderError) -> FailureCategory {
    match error {
        ProviderError::Http { status, .. } if (400..500).contains(status) => {
            FailureCategory::Blocked
        }
        _ => FailureCategory::Unreachable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_failure() {
        let blocked = ProviderError::Http { status: 403, message: String::new() };
        assert_eq!(classify_failure(&blocked), FailureCategory::Blocked);

        let down = ProviderError::Http { status: 502, message: String::new() };
        assert_eq!(classify_failure(&down), FailureCategory::Unreachable);

        let net = ProviderError::Connection("refused".to_string());
        assert_eq!(classify_failure(&net), FailureCategory::Unreachable);
    }
}
