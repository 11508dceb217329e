//! Cross-user analysis cache resolver.
//!
//! Before acquiring or analyzing anything, the controller looks for a
//! recent analysis of the same normalized URL by another user. A full hit
//! clones the whole analysis (summary, claims, text, metadata) onto the
//! requesting user's item with zero provider calls. A candidate with text
//! but no complete summary still saves acquisition work.

use chrono::Utc;
use tracing::info;

use crate::models::{Claim, ContentItem, ProcessingStatus};
use crate::repository::{ClaimRepository, ContentRepository, Result, SummaryRepository};

/// How many recent candidates to inspect per lookup.
const MAX_CANDIDATES: usize = 5;

/// What the cache lookup produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome {
    /// A complete analysis was cloned onto the item; no provider calls
    /// are needed.
    Full { sections: Vec<String> },
    /// Acquired text and metadata were copied; analysis still runs.
    TextOnly,
    Miss,
}

/// Resolve the cache for an item, mutating and persisting it on a hit.
pub fn resolve(
    content: &ContentRepository,
    summaries: &SummaryRepository,
    claims: &ClaimRepository,
    item: &mut ContentItem,
) -> Result<CacheOutcome> {
    let candidates = content.find_cache_candidates(
        &item.normalized_url,
        item.user_id.as_deref(),
        item.source_type,
        Utc::now(),
        MAX_CANDIDATES,
    )?;
    if candidates.is_empty() {
        return Ok(CacheOutcome::Miss);
    }

    for candidate in &candidates {
        let Some(summary) = summaries.get(&candidate.id, &item.analysis_language)? else {
            continue;
        };
        if summary.processing_status != ProcessingStatus::Complete
            || summary.present_sections().is_empty()
        {
            continue;
        }

        copy_payload(item, candidate);
        content.save(item)?;
        summaries.clone_from(&summary, &item.id)?;

        // Claims are re-keyed to the new item and owner, not shared rows.
        let cloned: Vec<Claim> = claims
            .get_for_content(&candidate.id)?
            .iter()
            .map(|c| {
                Claim::new(
                    &item.id,
                    item.user_id.as_deref(),
                    &c.claim_text,
                    c.status,
                    c.severity,
                    c.sources.clone(),
                )
            })
            .collect();
        if !cloned.is_empty() {
            claims.replace_for_content(&item.id, &cloned)?;
        }

        let sections: Vec<String> =
            summary.present_sections().iter().map(|s| s.to_string()).collect();
        info!(
            "cache hit: cloned {} sections from {} onto {}",
            sections.len(),
            candidate.id,
            item.id
        );
        return Ok(CacheOutcome::Full { sections });
    }

    // No complete analysis, but a candidate's acquired text still spares
    // us the scrape/transcript.
    let source = &candidates[0];
    copy_payload(item, source);
    content.save(item)?;
    info!("cache text-only hit: copied acquisition from {}", source.id);
    Ok(CacheOutcome::TextOnly)
}

fn copy_payload(item: &mut ContentItem, source: &ContentItem) {
    item.title = source.title.clone();
    item.author = source.author.clone();
    item.duration_secs = source.duration_secs;
    item.view_count = source.view_count;
    item.full_text = source.full_text.clone();
    item.detected_tone = source.detected_tone.clone();
    item.tags = source.tags.clone();
    item.updated_at = Utc::now();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClaimSeverity, ClaimStatus, SectionKind};

    struct Repos {
        _dir: tempfile::TempDir,
        content: ContentRepository,
        summaries: SummaryRepository,
        claims: ClaimRepository,
    }

    fn repos() -> Repos {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("test.db");
        Repos {
            content: ContentRepository::new(&db).unwrap(),
            summaries: SummaryRepository::new(&db).unwrap(),
            claims: ClaimRepository::new(&db).unwrap(),
            _dir: dir,
        }
    }

    fn seeded_candidate(r: &Repos, url: &str, complete: bool) -> ContentItem {
        let mut candidate = ContentItem::new(url, Some("them".to_string()), "en");
        candidate.title = Some("A title".to_string());
        candidate.full_text = Some("acquired body text".to_string());
        candidate.tags = vec!["news".to_string()];
        r.content.save(&candidate).unwrap();
        if complete {
            r.summaries
                .upsert_section(&candidate.id, "en", SectionKind::Overview, "the overview")
                .unwrap();
            r.summaries
                .set_status(&candidate.id, "en", ProcessingStatus::Complete)
                .unwrap();
            r.claims
                .replace_for_content(
                    &candidate.id,
                    &[Claim::new(
                        &candidate.id,
                        Some("them"),
                        "A claim",
                        ClaimStatus::Verified,
                        ClaimSeverity::Low,
                        vec![],
                    )],
                )
                .unwrap();
        }
        candidate
    }

    #[test]
    fn test_full_hit_clones_everything() {
        let r = repos();
        let url = "https://example.com/story";
        seeded_candidate(&r, url, true);

        let mut item = ContentItem::new(url, Some("me".to_string()), "en");
        r.content.save(&item).unwrap();
        let outcome = resolve(&r.content, &r.summaries, &r.claims, &mut item).unwrap();

        assert_eq!(outcome, CacheOutcome::Full { sections: vec!["overview".to_string()] });
        assert_eq!(item.full_text.as_deref(), Some("acquired body text"));

        let cloned = r.summaries.get(&item.id, "en").unwrap().unwrap();
        assert_eq!(cloned.overview.as_deref(), Some("the overview"));
        assert_eq!(cloned.processing_status, ProcessingStatus::Complete);

        let claims = r.claims.get_for_content(&item.id).unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].user_id.as_deref(), Some("me"));
    }

    #[test]
    fn test_text_only_hit_copies_acquisition() {
        let r = repos();
        let url = "https://example.com/other";
        seeded_candidate(&r, url, false);

        let mut item = ContentItem::new(url, Some("me".to_string()), "en");
        r.content.save(&item).unwrap();
        let outcome = resolve(&r.content, &r.summaries, &r.claims, &mut item).unwrap();

        assert_eq!(outcome, CacheOutcome::TextOnly);
        assert_eq!(item.full_text.as_deref(), Some("acquired body text"));
        assert!(r.summaries.get(&item.id, "en").unwrap().is_none());
    }

    #[test]
    fn test_language_mismatch_is_text_only() {
        let r = repos();
        let url = "https://example.com/lang";
        seeded_candidate(&r, url, true);

        let mut item = ContentItem::new(url, Some("me".to_string()), "de");
        r.content.save(&item).unwrap();
        let outcome = resolve(&r.content, &r.summaries, &r.claims, &mut item).unwrap();
        assert_eq!(outcome, CacheOutcome::TextOnly);
    }

    #[test]
    fn test_miss_when_no_candidates() {
        let r = repos();
        let mut item = ContentItem::new("https://example.com/new", Some("me".to_string()), "en");
        r.content.save(&item).unwrap();
        let outcome = resolve(&r.content, &r.summaries, &r.claims, &mut item).unwrap();
        assert_eq!(outcome, CacheOutcome::Miss);
    }
}
