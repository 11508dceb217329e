//! Summary model: the per-language analysis output for a content item.
//!
//! A summary row is keyed by `(content_id, language)` and filled in
//! incrementally as sections complete. Section writes are independent
//! upserts; sections are never reset except by an explicit regeneration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline status recorded on the summary row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// No processing has happened yet.
    None,
    /// Waiting on an external transcription job (podcast).
    Transcribing,
    /// Phase-1 enrichment lookups are running.
    Enriching,
    /// Phase-2 section generation is running.
    Generating,
    /// The pipeline deadline elapsed; whatever persisted stands.
    Partial,
    /// At least one section persisted and the run finished.
    Complete,
    /// Moderation pre-screen blocked analysis.
    Refused,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Transcribing => "transcribing",
            Self::Enriching => "enriching",
            Self::Generating => "generating",
            Self::Partial => "partial",
            Self::Complete => "complete",
            Self::Refused => "refused",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "transcribing" => Some(Self::Transcribing),
            "enriching" => Some(Self::Enriching),
            "generating" => Some(Self::Generating),
            "partial" => Some(Self::Partial),
            "complete" => Some(Self::Complete),
            "refused" => Some(Self::Refused),
            _ => None,
        }
    }
}

/// The seven analysis sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Overview,
    Triage,
    MidSummary,
    DetailedSummary,
    AutoTags,
    TruthCheck,
    ActionItems,
}

impl SectionKind {
    pub const ALL: [SectionKind; 7] = [
        Self::Overview,
        Self::Triage,
        Self::MidSummary,
        Self::DetailedSummary,
        Self::AutoTags,
        Self::TruthCheck,
        Self::ActionItems,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Triage => "triage",
            Self::MidSummary => "mid_summary",
            Self::DetailedSummary => "detailed_summary",
            Self::AutoTags => "auto_tags",
            Self::TruthCheck => "truth_check",
            Self::ActionItems => "action_items",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "overview" => Some(Self::Overview),
            "triage" => Some(Self::Triage),
            "mid_summary" => Some(Self::MidSummary),
            "detailed_summary" => Some(Self::DetailedSummary),
            "auto_tags" => Some(Self::AutoTags),
            "truth_check" => Some(Self::TruthCheck),
            "action_items" => Some(Self::ActionItems),
            _ => None,
        }
    }

    /// Maximum content slice sent to the model, in characters.
    /// Tiered by section cost and importance.
    pub fn slice_limit(&self) -> usize {
        match self {
            Self::Overview => 8_000,
            Self::Triage | Self::AutoTags => 10_000,
            Self::MidSummary => 10_000,
            Self::ActionItems => 15_000,
            Self::TruthCheck => 20_000,
            Self::DetailedSummary => 30_000,
        }
    }

    /// Whether the model must return structured JSON for this section.
    pub fn expects_json(&self) -> bool {
        matches!(
            self,
            Self::Triage | Self::AutoTags | Self::TruthCheck | Self::ActionItems
        )
    }

    /// Critical sections get one self-heal retry when they fail.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Overview | Self::Triage | Self::DetailedSummary)
    }
}

/// Analysis output for one `(content_id, language)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub id: i64,
    pub content_id: String,
    pub language: String,
    pub overview: Option<String>,
    pub triage: Option<String>,
    pub mid_summary: Option<String>,
    pub detailed_summary: Option<String>,
    pub auto_tags: Option<String>,
    pub truth_check: Option<String>,
    pub action_items: Option<String>,
    pub processing_status: ProcessingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Summary {
    pub fn new(content_id: &str, language: &str) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Set by database
            content_id: content_id.to_string(),
            language: language.to_string(),
            overview: None,
            triage: None,
            mid_summary: None,
            detailed_summary: None,
            auto_tags: None,
            truth_check: None,
            action_items: None,
            processing_status: ProcessingStatus::None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Get a section's stored value.
    pub fn section(&self, kind: SectionKind) -> Option<&str> {
        match kind {
            SectionKind::Overview => self.overview.as_deref(),
            SectionKind::Triage => self.triage.as_deref(),
            SectionKind::MidSummary => self.mid_summary.as_deref(),
            SectionKind::DetailedSummary => self.detailed_summary.as_deref(),
            SectionKind::AutoTags => self.auto_tags.as_deref(),
            SectionKind::TruthCheck => self.truth_check.as_deref(),
            SectionKind::ActionItems => self.action_items.as_deref(),
        }
    }

    /// Set a section's value in memory.
    pub fn set_section(&mut self, kind: SectionKind, value: String) {
        let slot = match kind {
            SectionKind::Overview => &mut self.overview,
            SectionKind::Triage => &mut self.triage,
            SectionKind::MidSummary => &mut self.mid_summary,
            SectionKind::DetailedSummary => &mut self.detailed_summary,
            SectionKind::AutoTags => &mut self.auto_tags,
            SectionKind::TruthCheck => &mut self.truth_check,
            SectionKind::ActionItems => &mut self.action_items,
        };
        *slot = Some(value);
        self.updated_at = Utc::now();
    }

    /// Names of all sections currently present.
    pub fn present_sections(&self) -> Vec<&'static str> {
        SectionKind::ALL
            .iter()
            .filter(|k| self.section(**k).is_some())
            .map(|k| k.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_round_trip() {
        let mut s = Summary::new("c1", "en");
        assert!(s.section(SectionKind::Overview).is_none());
        s.set_section(SectionKind::Overview, "an overview".to_string());
        assert_eq!(s.section(SectionKind::Overview), Some("an overview"));
        assert_eq!(s.present_sections(), vec!["overview"]);
    }

    #[test]
    fn test_slice_tiers() {
        assert_eq!(SectionKind::Overview.slice_limit(), 8_000);
        assert_eq!(SectionKind::Triage.slice_limit(), 10_000);
        assert_eq!(SectionKind::ActionItems.slice_limit(), 15_000);
        assert_eq!(SectionKind::TruthCheck.slice_limit(), 20_000);
        assert_eq!(SectionKind::DetailedSummary.slice_limit(), 30_000);
    }

    #[test]
    fn test_critical_sections() {
        let critical: Vec<_> = SectionKind::ALL.iter().filter(|k| k.is_critical()).collect();
        assert_eq!(critical.len(), 3);
        assert!(SectionKind::Overview.is_critical());
        assert!(SectionKind::Triage.is_critical());
        assert!(SectionKind::DetailedSummary.is_critical());
        assert!(!SectionKind::TruthCheck.is_critical());
    }

    #[test]
    fn test_status_round_trip() {
        for s in [
            ProcessingStatus::None,
            ProcessingStatus::Transcribing,
            ProcessingStatus::Enriching,
            ProcessingStatus::Generating,
            ProcessingStatus::Partial,
            ProcessingStatus::Complete,
            ProcessingStatus::Refused,
        ] {
            assert_eq!(ProcessingStatus::from_str(s.as_str()), Some(s));
        }
    }
}
