//! Claim model: atomic factual assertions extracted from truth-check output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Verification status of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Verified,
    False,
    Misleading,
    Unverified,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::False => "false",
            Self::Misleading => "misleading",
            Self::Unverified => "unverified",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "verified" | "true" | "accurate" => Some(Self::Verified),
            "false" | "inaccurate" => Some(Self::False),
            "misleading" | "partially_true" | "mixed" => Some(Self::Misleading),
            "unverified" | "unknown" => Some(Self::Unverified),
            _ => None,
        }
    }
}

/// How serious a false or misleading claim is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimSeverity {
    High,
    Medium,
    Low,
}

impl ClaimSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "high" | "critical" => Some(Self::High),
            "medium" | "moderate" => Some(Self::Medium),
            "low" | "minor" => Some(Self::Low),
            _ => None,
        }
    }
}

/// A tracked factual claim for one content item.
///
/// Claims are fully replaced (delete-then-insert) on each regeneration of
/// the truth-check section, never merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: i64,
    pub content_id: String,
    pub user_id: Option<String>,
    pub claim_text: String,
    /// Lowercased, punctuation-stripped form for cross-referencing.
    pub normalized_text: String,
    pub status: ClaimStatus,
    pub severity: ClaimSeverity,
    /// Citation URLs that survived the anti-hallucination gate.
    pub sources: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Claim {
    pub fn new(
        content_id: &str,
        user_id: Option<&str>,
        claim_text: &str,
        status: ClaimStatus,
        severity: ClaimSeverity,
        sources: Vec<String>,
    ) -> Self {
        Self {
            id: 0, // Set by database
            content_id: content_id.to_string(),
            user_id: user_id.map(|s| s.to_string()),
            claim_text: claim_text.to_string(),
            normalized_text: crate::utils::normalize_claim(claim_text),
            status,
            severity,
            sources,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes() {
        let c = Claim::new(
            "c1",
            None,
            "The Moon is made of CHEESE!",
            ClaimStatus::False,
            ClaimSeverity::Low,
            vec![],
        );
        assert_eq!(c.normalized_text, "the moon is made of cheese");
    }

    #[test]
    fn test_status_aliases() {
        assert_eq!(ClaimStatus::from_str("accurate"), Some(ClaimStatus::Verified));
        assert_eq!(ClaimStatus::from_str("mixed"), Some(ClaimStatus::Misleading));
        assert_eq!(ClaimStatus::from_str("nonsense"), None);
    }
}
