//! Content item model.
//!
//! A content item is one ingested URL plus whatever text and metadata
//! acquisition produced for it. Acquisition failures are recorded on the
//! item itself via a sentinel prefix in `full_text`, so downstream code
//! can read "why" without a separate error table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::normalize_url;

/// Prefix marking `full_text` as an acquisition failure record.
pub const FAILURE_SENTINEL_PREFIX: &str = "PROCESSING_FAILED";

/// Kind of source a URL points at. Drives the acquisition adapter choice
/// and the cross-user cache staleness window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Video,
    Article,
    Podcast,
    ShortPost,
    Document,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Article => "article",
            Self::Podcast => "podcast",
            Self::ShortPost => "short_post",
            Self::Document => "document",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "video" => Some(Self::Video),
            "article" => Some(Self::Article),
            "podcast" => Some(Self::Podcast),
            "short_post" => Some(Self::ShortPost),
            "document" => Some(Self::Document),
            _ => None,
        }
    }

    /// Staleness window for cross-user cache candidates, in days.
    ///
    /// Articles and short posts churn quickly; video and audio rarely
    /// change after publication; static documents effectively never do.
    pub fn cache_staleness_days(&self) -> i64 {
        match self {
            Self::Article | Self::ShortPost => 3,
            Self::Video | Self::Podcast => 14,
            Self::Document => 30,
        }
    }

    /// Detect the source type from a URL host.
    pub fn detect(url: &str) -> Self {
        let host = crate::utils::domain_of(url).unwrap_or_default();
        if host.contains("youtube.com") || host == "youtu.be" || host.contains("vimeo.com") {
            Self::Video
        } else if host.contains("twitter.com")
            || host == "x.com"
            || host.contains("bsky.app")
            || host.contains("mastodon")
            || host.contains("threads.net")
        {
            Self::ShortPost
        } else if host.contains("podcasts.apple.com")
            || host.contains("spotify.com")
            || url.ends_with(".mp3")
            || url.ends_with(".m4a")
        {
            Self::Podcast
        } else if url.ends_with(".pdf") || url.ends_with(".docx") {
            Self::Document
        } else {
            Self::Article
        }
    }
}

/// Category of an acquisition failure, encoded into the sentinel text so
/// the caller can show a specific user-facing reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// The source could not be reached (network, 5xx after retries).
    Unreachable,
    /// The source responded but refused us (4xx).
    Blocked,
    /// A video had no transcript available.
    NoTranscript,
    /// Extracted text was too short to analyze.
    TooShort,
    /// Transcription job failed.
    TranscriptionFailed,
    /// Content failed the moderation pre-screen.
    PolicyViolation,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unreachable => "unreachable",
            Self::Blocked => "blocked",
            Self::NoTranscript => "no_transcript",
            Self::TooShort => "too_short",
            Self::TranscriptionFailed => "transcription_failed",
            Self::PolicyViolation => "policy_violation",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unreachable" => Some(Self::Unreachable),
            "blocked" => Some(Self::Blocked),
            "no_transcript" => Some(Self::NoTranscript),
            "too_short" => Some(Self::TooShort),
            "transcription_failed" => Some(Self::TranscriptionFailed),
            "policy_violation" => Some(Self::PolicyViolation),
            _ => None,
        }
    }

    /// Short user-facing explanation for this failure category.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unreachable => "The source could not be reached. It may be down or blocking automated access.",
            Self::Blocked => "The source refused the request for this content.",
            Self::NoTranscript => "No transcript is available for this video.",
            Self::TooShort => "Not enough text could be extracted from this source to analyze.",
            Self::TranscriptionFailed => "Audio transcription failed for this content.",
            Self::PolicyViolation => "This content cannot be analyzed because it violates content policy.",
        }
    }
}

/// One ingested URL and its acquired text/metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    /// Owning user; `None` for anonymous ingestion.
    pub user_id: Option<String>,
    pub url: String,
    /// Canonical form of `url` used for cache matching.
    pub normalized_url: String,
    pub source_type: SourceType,
    pub title: Option<String>,
    pub author: Option<String>,
    /// Duration in seconds for video/audio sources.
    pub duration_secs: Option<i64>,
    pub view_count: Option<i64>,
    /// Acquired text, or a failure sentinel (see [`FAILURE_SENTINEL_PREFIX`]).
    pub full_text: Option<String>,
    pub detected_tone: Option<String>,
    pub tags: Vec<String>,
    pub analysis_language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    /// Create a new content item for a URL, detecting the source type.
    pub fn new(url: &str, user_id: Option<String>, language: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            normalized_url: normalize_url(url),
            source_type: SourceType::detect(url),
            url: url.to_string(),
            title: None,
            author: None,
            duration_secs: None,
            view_count: None,
            full_text: None,
            detected_tone: None,
            tags: Vec::new(),
            analysis_language: language.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record an acquisition failure as a sentinel in `full_text`.
    pub fn mark_failed(&mut self, category: FailureCategory) {
        self.full_text = Some(format!(
            "{}::{}::{}",
            FAILURE_SENTINEL_PREFIX,
            self.source_type.as_str().to_uppercase(),
            category.as_str().to_uppercase()
        ));
        self.updated_at = Utc::now();
    }

    /// Read back the failure category from the sentinel, if present.
    pub fn failure_category(&self) -> Option<FailureCategory> {
        let text = self.full_text.as_deref()?;
        let rest = text.strip_prefix(FAILURE_SENTINEL_PREFIX)?;
        let category = rest.rsplit("::").next()?;
        FailureCategory::from_str(&category.to_lowercase())
    }

    /// Whether the item has acquired text usable for analysis.
    pub fn has_usable_text(&self) -> bool {
        match &self.full_text {
            Some(text) => !text.is_empty() && !text.starts_with(FAILURE_SENTINEL_PREFIX),
            None => false,
        }
    }
}
