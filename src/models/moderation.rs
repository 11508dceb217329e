//! Moderation flags raised by refusal detection and the pre-screen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded moderation event for review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationFlag {
    pub id: i64,
    pub content_id: String,
    /// Section the flag came from, or "pre_screen".
    pub section: String,
    pub reason: String,
    /// Excerpt of the text that triggered the flag.
    pub excerpt: String,
    pub created_at: DateTime<Utc>,
}

impl ModerationFlag {
    pub fn new(content_id: &str, section: &str, reason: &str, excerpt: &str) -> Self {
        Self {
            id: 0, // Set by database
            content_id: content_id.to_string(),
            section: section.to_string(),
            reason: reason.to_string(),
            excerpt: crate::utils::truncate_utf8(excerpt, 500).to_string(),
            created_at: Utc::now(),
        }
    }
}
