//! Typed parsing and validation of model output per section.
//!
//! JSON sections are parsed into structs and re-serialized, so what lands
//! in the database is canonical JSON rather than whatever the model
//! wrapped it in. A parse failure is returned as `ProviderError::Parse`,
//! which the retry layer treats as retryable.

use serde::{Deserialize, Serialize};

use crate::models::SectionKind;
use crate::providers::ProviderError;

/// Triage classification of a content item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageResult {
    pub category: String,
    pub quality_score: i64,
    #[serde(default)]
    pub audience: String,
    #[serde(default)]
    pub density: String,
}

impl TriageResult {
    /// Entertainment-class content skips fact-checking and action items.
    pub fn is_entertainment(&self) -> bool {
        matches!(self.category.to_lowercase().as_str(), "music" | "entertainment")
    }
}

/// One fact-checked claim inside a truth-check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruthClaim {
    pub claim: String,
    pub status: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub explanation: String,
    /// 1-based indexes into `references`.
    #[serde(default)]
    pub source_indexes: Vec<usize>,
}

/// A content-quality issue that is not a discrete claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruthIssue {
    pub issue: String,
    #[serde(default)]
    pub severity: String,
}

/// Structured truth-check output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruthCheckResult {
    pub overall_rating: String,
    pub quality_score: i64,
    #[serde(default)]
    pub assessment: String,
    #[serde(default)]
    pub claims: Vec<TruthClaim>,
    #[serde(default)]
    pub issues: Vec<TruthIssue>,
    #[serde(default)]
    pub references: Vec<String>,
}

/// One actionable takeaway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionItem {
    pub action: String,
    #[serde(default)]
    pub detail: String,
}

/// Structured action-items output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionItemsResult {
    #[serde(default)]
    pub items: Vec<ActionItem>,
}

/// Strip a Markdown code fence the model may have wrapped JSON in.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip an optional language tag on the fence line
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.trim_end_matches('`').trim()
}

fn parse_err(kind: SectionKind, e: impl std::fmt::Display) -> ProviderError {
    ProviderError::Parse(format!("{}: {e}", kind.as_str()))
}

/// Parse a JSON array of tags, normalized to lowercase and deduplicated.
pub fn parse_tags(raw: &str) -> Result<Vec<String>, ProviderError> {
    let parsed: Vec<String> = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| parse_err(SectionKind::AutoTags, e))?;
    let mut tags: Vec<String> = Vec::new();
    for tag in parsed {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    if tags.is_empty() {
        return Err(parse_err(SectionKind::AutoTags, "no tags"));
    }
    Ok(tags)
}

/// Parse the claim-extraction helper output: a JSON array of claim strings.
pub fn parse_claim_list(raw: &str) -> Result<Vec<String>, ProviderError> {
    let parsed: Vec<String> = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| ProviderError::Parse(format!("claim_extraction: {e}")))?;
    Ok(parsed
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect())
}

pub fn parse_triage(raw: &str) -> Result<TriageResult, ProviderError> {
    serde_json::from_str(strip_code_fences(raw)).map_err(|e| parse_err(SectionKind::Triage, e))
}

pub fn parse_truth_check(raw: &str) -> Result<TruthCheckResult, ProviderError> {
    serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| parse_err(SectionKind::TruthCheck, e))
}

/// Validate raw model output for a section and return the canonical string
/// to persist. JSON sections round-trip through their typed structs; prose
/// sections must be non-empty.
pub fn validate_section(kind: SectionKind, raw: &str) -> Result<String, ProviderError> {
    match kind {
        SectionKind::Triage => {
            let triage = parse_triage(raw)?;
            serde_json::to_string(&triage).map_err(|e| parse_err(kind, e))
        }
        SectionKind::AutoTags => {
            let tags = parse_tags(raw)?;
            serde_json::to_string(&tags).map_err(|e| parse_err(kind, e))
        }
        SectionKind::TruthCheck => {
            let truth = parse_truth_check(raw)?;
            serde_json::to_string(&truth).map_err(|e| parse_err(kind, e))
        }
        SectionKind::ActionItems => {
            let items: ActionItemsResult = serde_json::from_str(strip_code_fences(raw))
                .map_err(|e| parse_err(kind, e))?;
            serde_json::to_string(&items).map_err(|e| parse_err(kind, e))
        }
        SectionKind::Overview | SectionKind::MidSummary | SectionKind::DetailedSummary => {
            let text = raw.trim();
            if text.is_empty() {
                return Err(parse_err(kind, "empty output"));
            }
            Ok(text.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[1,2]\n```"), "[1,2]");
    }

    #[test]
    fn test_parse_triage() {
        let raw = r#"{"category": "Music", "quality_score": 40, "audience": "general", "density": "light"}"#;
        let triage = parse_triage(raw).unwrap();
        assert!(triage.is_entertainment());
        assert_eq!(triage.quality_score, 40);

        assert!(parse_triage("not json").is_err());
    }

    #[test]
    fn test_parse_tags_normalizes() {
        let tags = parse_tags(r#"["Climate-Policy", "interview", "climate-policy", " "]"#).unwrap();
        assert_eq!(tags, vec!["climate-policy", "interview"]);
        assert!(parse_tags("[]").is_err());
    }

    #[test]
    fn test_parse_truth_check_defaults() {
        let raw = r#"{"overall_rating": "mixed", "quality_score": 55}"#;
        let truth = parse_truth_check(raw).unwrap();
        assert_eq!(truth.overall_rating, "mixed");
        assert!(truth.claims.is_empty());
        assert!(truth.references.is_empty());
    }

    #[test]
    fn test_validate_prose_sections() {
        assert!(validate_section(SectionKind::Overview, "  \n").is_err());
        assert_eq!(
            validate_section(SectionKind::Overview, "  text  ").unwrap(),
            "text"
        );
    }

    #[test]
    fn test_validate_canonicalizes_json() {
        let raw = "```json\n{\"items\": [{\"action\": \"do it\"}]}\n```";
        let stored = validate_section(SectionKind::ActionItems, raw).unwrap();
        let parsed: ActionItemsResult = serde_json::from_str(&stored).unwrap();
        assert_eq!(parsed.items[0].action, "do it");
        assert!(!stored.contains("```"));
    }
}
