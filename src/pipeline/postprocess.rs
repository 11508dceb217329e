//! Post-generation hardening of the truth-check output.
//!
//! The citation gate drops every reference URL the enrichment searches
//! never actually returned, so the model cannot launder invented sources
//! into the analysis. Surviving claims are indexed as first-class rows,
//! and the source domain's credibility record is updated.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{info, warn};

use super::parse::TruthCheckResult;
use crate::models::{Claim, ClaimSeverity, ClaimStatus, ContentItem};
use crate::repository::{DomainStatsRepository, RatingBucket, Result};
use crate::utils::normalize_url;

fn marker_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(r"\[(\d+)\]").expect("pattern is a compile-time constant"))
}

/// Drop references that never appeared in a search result, remapping
/// `[N]` citation markers and claim source indexes to the filtered list.
/// Returns how many references were dropped.
pub(super) fn apply_citation_gate(
    truth: &mut TruthCheckResult,
    allowed: &HashSet<String>,
) -> usize {
    let original = std::mem::take(&mut truth.references);
    // old 1-based index -> new 1-based index, for survivors only
    let mut index_map: HashMap<usize, usize> = HashMap::new();
    for (old_idx, url) in original.iter().enumerate() {
        if allowed.contains(&normalize_url(url)) {
            truth.references.push(url.clone());
            index_map.insert(old_idx + 1, truth.references.len());
        }
    }
    let dropped = original.len() - truth.references.len();

    let remap_text = |text: &str| -> String {
        marker_regex()
            .replace_all(text, |caps: &regex::Captures| {
                let old: usize = caps[1].parse().unwrap_or(0);
                match index_map.get(&old) {
                    Some(new) => format!("[{new}]"),
                    None => String::new(),
                }
            })
            .into_owned()
    };

    truth.assessment = remap_text(&truth.assessment);
    for claim in &mut truth.claims {
        claim.explanation = remap_text(&claim.explanation);
        claim.source_indexes = claim
            .source_indexes
            .iter()
            .filter_map(|old| index_map.get(old).copied())
            .collect();
    }
    dropped
}

/// Build claim rows from a gated truth-check: fact-checked claims plus
/// quality issues (which carry no verdict and index as unverified).
pub(super) fn claims_from_truth(item: &ContentItem, truth: &TruthCheckResult) -> Vec<Claim> {
    let user_id = item.user_id.as_deref();
    let mut claims = Vec::new();
    for tc in &truth.claims {
        if tc.claim.trim().is_empty() {
            continue;
        }
        let status = ClaimStatus::from_str(&tc.status.to_lowercase())
            .unwrap_or(ClaimStatus::Unverified);
        let severity = ClaimSeverity::from_str(&tc.severity.to_lowercase())
            .unwrap_or(ClaimSeverity::Low);
        let sources = tc
            .source_indexes
            .iter()
            .filter_map(|i| i.checked_sub(1).and_then(|i| truth.references.get(i)))
            .cloned()
            .collect();
        claims.push(Claim::new(&item.id, user_id, &tc.claim, status, severity, sources));
    }
    for issue in &truth.issues {
        if issue.issue.trim().is_empty() {
            continue;
        }
        let severity = ClaimSeverity::from_str(&issue.severity.to_lowercase())
            .unwrap_or(ClaimSeverity::Low);
        claims.push(Claim::new(
            &item.id,
            user_id,
            &issue.issue,
            ClaimStatus::Unverified,
            severity,
            Vec::new(),
        ));
    }
    claims
}

/// Fold a completed truth-check into the source domain's record.
pub(super) fn domain_feedback(
    domains: &DomainStatsRepository,
    item: &ContentItem,
    truth: &TruthCheckResult,
) -> Result<()> {
    let Some(domain) = crate::utils::domain_of(&item.url) else {
        return Ok(());
    };
    let Some(bucket) = RatingBucket::from_rating(&truth.overall_rating) else {
        warn!(
            "unrecognized overall_rating {:?} for {}, skipping domain feedback",
            truth.overall_rating, item.id
        );
        return Ok(());
    };
    let quality = truth.quality_score.clamp(0, 100);
    domains.record_analysis(&domain, quality, bucket)?;
    info!("domain feedback: {domain} rated {:?} quality {quality}", truth.overall_rating);
    Ok(())
}
