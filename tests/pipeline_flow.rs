//! End-to-end pipeline runs against scripted providers.

mod common;

use std::sync::Arc;

use async_trait::async_trait;

use common::{harness, harness_with, test_config};
use veriscope::models::{ContentItem, FailureCategory, ProcessingStatus};
use veriscope::pipeline::{PipelineError, ProcessOptions, QuotaDenied, QuotaGate};

#[tokio::test]
async fn test_article_full_run() {
    let h = harness();
    let outcome = h
        .service
        .process_url(
            "https://example.com/news/budget-bill",
            Some("alice"),
            "en",
            ProcessOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, ProcessingStatus::Complete);
    assert!(!outcome.cached);
    assert_eq!(outcome.sections.len(), 7, "sections: {:?}", outcome.sections);
    assert!(outcome.tokens.total() > 0);
    assert!(outcome.failure_message.is_none());

    let deps = h.service.deps();
    let item = deps.content.get(&outcome.content_id).unwrap().unwrap();
    assert_eq!(item.title.as_deref(), Some("Budget bill passes"));
    assert_eq!(item.detected_tone.as_deref(), Some("serious"));
    assert_eq!(item.tags, vec!["budget", "senate"]);

    // Truth-check results are indexed as claims and fed back per domain.
    let claims = deps.claims.get_for_content(&item.id).unwrap();
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].sources, vec!["https://news.example/budget"]);

    let stats = deps.domains.get("example.com").unwrap().unwrap();
    assert_eq!(stats.analysis_count, 1);
}

#[tokio::test]
async fn test_video_transcript_keeps_timestamps() {
    let h = harness();
    let outcome = h
        .service
        .process_url(
            "https://www.youtube.com/watch?v=abc",
            Some("alice"),
            "en",
            ProcessOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, ProcessingStatus::Complete);
    let item = h.service.deps().content.get(&outcome.content_id).unwrap().unwrap();
    assert_eq!(item.title.as_deref(), Some("Budget hearing"));
    assert_eq!(item.duration_secs, Some(95));
    let text = item.full_text.unwrap();
    assert!(text.starts_with("[00:00]"), "got: {text}");
    assert!(text.contains("[00:30]"));
}

#[tokio::test]
async fn test_video_without_transcript_fails_soft() {
    let h = harness();
    h.transcript.clear();

    let outcome = h
        .service
        .process_url(
            "https://www.youtube.com/watch?v=abc",
            Some("alice"),
            "en",
            ProcessOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, ProcessingStatus::None);
    assert!(outcome.failure_message.unwrap().contains("transcript"));
    let item = h.service.deps().content.get(&outcome.content_id).unwrap().unwrap();
    assert_eq!(item.failure_category(), Some(FailureCategory::NoTranscript));
}

#[tokio::test]
async fn test_blocked_scrape_reports_category() {
    let h = harness();
    h.scraper.fail.store(true, std::sync::atomic::Ordering::SeqCst);

    let outcome = h
        .service
        .process_url("https://example.com/story", Some("alice"), "en", ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.status, ProcessingStatus::None);
    assert!(outcome.failure_message.unwrap().contains("refused"));
    assert_eq!(h.completion.call_count(), 0);
}

#[tokio::test]
async fn test_short_extraction_fails_soft() {
    let h = harness();
    h.scraper.set_text("Too short.");

    let outcome = h
        .service
        .process_url("https://example.com/stub", Some("alice"), "en", ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.status, ProcessingStatus::None);
    let item = h.service.deps().content.get(&outcome.content_id).unwrap().unwrap();
    assert_eq!(item.failure_category(), Some(FailureCategory::TooShort));
}

#[tokio::test]
async fn test_paywalled_text_warns_but_analyzes() {
    let h = harness();
    let text = format!("{} Subscribe to continue reading.", "A real paragraph. ".repeat(20));
    h.scraper.set_text(&text);

    let outcome = h
        .service
        .process_url("https://example.com/paywalled", Some("alice"), "en", ProcessOptions::default())
        .await
        .unwrap();

    assert!(outcome.paywall_warning);
    assert_eq!(outcome.status, ProcessingStatus::Complete);
}

#[tokio::test]
async fn test_failed_section_does_not_block_others() {
    let h = harness();
    h.completion.fail_section("mid_summary");

    let outcome = h
        .service
        .process_url("https://example.com/news/a", Some("alice"), "en", ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.status, ProcessingStatus::Complete);
    assert_eq!(outcome.sections.len(), 6);
    assert!(!outcome.sections.iter().any(|s| s == "mid_summary"));
    assert!(outcome.sections.iter().any(|s| s == "overview"));
    assert!(outcome.sections.iter().any(|s| s == "truth_check"));
}

#[tokio::test]
async fn test_critical_section_self_heals() {
    let h = harness();
    // Two attempts fail (the whole first retry budget), the extra
    // attempt succeeds.
    h.completion.fail_first("overview", 2);

    let outcome = h
        .service
        .process_url("https://example.com/news/b", Some("alice"), "en", ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.status, ProcessingStatus::Complete);
    assert!(outcome.sections.iter().any(|s| s == "overview"));
}

#[tokio::test]
async fn test_entertainment_skips_fact_check() {
    let h = harness();
    h.completion.set_response(
        "triage",
        r#"{"category": "music", "quality_score": 55, "audience": "general", "density": "light"}"#,
    );

    let outcome = h
        .service
        .process_url("https://example.com/video-essay", Some("alice"), "en", ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.status, ProcessingStatus::Complete);
    assert!(!outcome.sections.iter().any(|s| s == "truth_check"));
    assert!(!outcome.sections.iter().any(|s| s == "action_items"));

    let deps = h.service.deps();
    assert!(deps.claims.get_for_content(&outcome.content_id).unwrap().is_empty());
    assert!(deps.domains.get("example.com").unwrap().is_none());
}

#[tokio::test]
async fn test_citation_gate_drops_fabricated_references() {
    let h = harness();
    h.completion.set_response(
        "truth_check",
        r#"{"overall_rating": "mixed", "quality_score": 60, "assessment": "One source is real [2] and one is invented [1].", "claims": [{"claim": "The budget bill passed the senate", "status": "verified", "severity": "low", "explanation": "Confirmed by [2].", "source_indexes": [2]}, {"claim": "Turnout was record-breaking", "status": "unverified", "severity": "medium", "explanation": "Only source [1] mentions this.", "source_indexes": [1]}], "issues": [], "references": ["https://fabricated.example/story", "https://news.example/budget"]}"#,
    );

    let outcome = h
        .service
        .process_url("https://example.com/news/c", Some("alice"), "en", ProcessOptions::default())
        .await
        .unwrap();

    let summary = h.service.deps().summaries.get(&outcome.content_id, "en").unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_str(summary.truth_check.as_deref().unwrap()).unwrap();

    // Only the URL that actually appeared in search results survives, and
    // the remaining citation markers are renumbered against the new list.
    assert_eq!(
        stored["references"],
        serde_json::json!(["https://news.example/budget"])
    );
    let assessment = stored["assessment"].as_str().unwrap();
    assert!(assessment.contains("real [1]"), "got: {assessment}");
    assert!(!assessment.contains("[2]"));
    assert_eq!(stored["claims"][0]["source_indexes"], serde_json::json!([1]));
    assert_eq!(stored["claims"][1]["source_indexes"], serde_json::json!([]));
}

#[tokio::test]
async fn test_refused_prose_section_is_flagged() {
    let h = harness();
    h.completion
        .set_response("overview", "I'm sorry, but I cannot summarize this content.");

    let outcome = h
        .service
        .process_url("https://example.com/news/d", Some("alice"), "en", ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.status, ProcessingStatus::Complete);
    assert!(!outcome.sections.iter().any(|s| s == "overview"));

    let flags = h.service.deps().moderation.get_for_content(&outcome.content_id).unwrap();
    assert!(flags.iter().any(|f| f.section == "overview"));
}

#[tokio::test]
async fn test_moderation_pre_screen_refuses() {
    let h = harness();
    let text = format!(
        "This clip explains how to build a bomb step by step. {}",
        "Filler sentence to pass the length check. ".repeat(10)
    );
    h.scraper.set_text(&text);

    let outcome = h
        .service
        .process_url("https://example.com/bad", Some("alice"), "en", ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.status, ProcessingStatus::Refused);
    assert!(outcome.failure_message.is_some());
    // Blocked before any AI call was made.
    assert_eq!(h.completion.call_count(), 0);

    let flags = h.service.deps().moderation.get_for_content(&outcome.content_id).unwrap();
    assert_eq!(flags.len(), 1);
    assert_eq!(flags[0].section, "pre_screen");
}

#[tokio::test]
async fn test_repeat_request_serves_stored_analysis() {
    let h = harness();
    let url = "https://example.com/news/e";
    h.service
        .process_url(url, Some("alice"), "en", ProcessOptions::default())
        .await
        .unwrap();
    let calls_after_first = h.completion.call_count();

    let second = h
        .service
        .process_url(url, Some("alice"), "en", ProcessOptions::default())
        .await
        .unwrap();
    assert!(second.cached);
    assert_eq!(second.status, ProcessingStatus::Complete);
    assert_eq!(h.completion.call_count(), calls_after_first);
}

#[tokio::test]
async fn test_cross_user_cache_clones_analysis() {
    let h = harness();
    let url = "https://example.com/news/f";
    let first = h
        .service
        .process_url(url, Some("alice"), "en", ProcessOptions::default())
        .await
        .unwrap();
    let ai_calls = h.completion.call_count();
    let search_calls = h.search.call_count();

    let second = h
        .service
        .process_url(url, Some("bob"), "en", ProcessOptions::default())
        .await
        .unwrap();

    assert!(second.cached);
    assert_eq!(second.status, ProcessingStatus::Complete);
    assert_ne!(second.content_id, first.content_id);
    // A full cache hit makes zero provider calls.
    assert_eq!(h.completion.call_count(), ai_calls);
    assert_eq!(h.search.call_count(), search_calls);

    // Claims were re-keyed to the new owner, not shared.
    let claims = h.service.deps().claims.get_for_content(&second.content_id).unwrap();
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].user_id.as_deref(), Some("bob"));
}

#[tokio::test]
async fn test_force_regenerate_reruns_analysis() {
    let h = harness();
    let url = "https://example.com/news/g";
    h.service
        .process_url(url, Some("alice"), "en", ProcessOptions::default())
        .await
        .unwrap();
    let calls_after_first = h.completion.call_count();

    let options = ProcessOptions { force_regenerate: true, ..Default::default() };
    let second = h.service.process_url(url, Some("alice"), "en", options).await.unwrap();

    assert!(!second.cached);
    assert_eq!(second.status, ProcessingStatus::Complete);
    assert!(h.completion.call_count() > calls_after_first);
}

#[tokio::test]
async fn test_podcast_waits_for_webhook() {
    let h = harness();
    let outcome = h
        .service
        .process_url(
            "https://podcasts.apple.com/us/podcast/budget-talk",
            Some("alice"),
            "en",
            ProcessOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.status, ProcessingStatus::Transcribing);

    // The provider got a callback URL carrying the content id.
    let callback = h.transcription.last_callback.lock().unwrap().clone().unwrap();
    assert_eq!(
        callback,
        format!(
            "https://api.test/webhooks/transcription?content_id={}",
            outcome.content_id
        )
    );

    // A repeat request while transcribing does not resubmit.
    let again = h
        .service
        .process_url(
            "https://podcasts.apple.com/us/podcast/budget-talk",
            Some("alice"),
            "en",
            ProcessOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(again.status, ProcessingStatus::Transcribing);

    // Webhook delivery resumes the analysis.
    let transcript = common::article_text();
    let resumed = h
        .service
        .resume_transcription(&outcome.content_id, &transcript)
        .await
        .unwrap();
    assert_eq!(resumed.status, ProcessingStatus::Complete);
    assert!(!resumed.sections.is_empty());
}

#[tokio::test]
async fn test_failed_transcription_records_category() {
    let h = harness();
    let outcome = h
        .service
        .process_url(
            "https://example.com/episode.mp3",
            Some("alice"),
            "en",
            ProcessOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.status, ProcessingStatus::Transcribing);

    let resumed = h.service.resume_transcription(&outcome.content_id, "").await.unwrap();
    assert_eq!(resumed.status, ProcessingStatus::None);
    assert!(resumed.failure_message.is_some());

    let item = h.service.deps().content.get(&outcome.content_id).unwrap().unwrap();
    assert_eq!(item.failure_category(), Some(FailureCategory::TranscriptionFailed));
}

#[tokio::test]
async fn test_unknown_content_resume_is_not_found() {
    let h = harness();
    let result = h.service.resume_transcription("missing-id", "text").await;
    assert!(matches!(result, Err(PipelineError::NotFound(_))));
}

#[tokio::test]
async fn test_expired_budget_settles_as_partial() {
    let mut config = test_config();
    config.pipeline_budget_secs = 0;
    let h = harness_with(config, Arc::new(veriscope::pipeline::UnlimitedQuota));

    // Seed an item that already has text so the run goes straight to
    // analysis under the zero budget.
    let mut item = ContentItem::new("https://example.com/news/slow", Some("alice".to_string()), "en");
    item.full_text = Some(common::article_text());
    h.service.deps().content.save(&item).unwrap();

    let outcome = h
        .service
        .process_url("https://example.com/news/slow", Some("alice"), "en", ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.status, ProcessingStatus::Partial);
    assert!(outcome.sections.is_empty());
}

struct DenyAll;

#[async_trait]
impl QuotaGate for DenyAll {
    async fn check_and_count(&self, _user_id: Option<&str>) -> Result<(), QuotaDenied> {
        Err(QuotaDenied {
            message: "daily analysis limit reached".to_string(),
            status: 402,
            upgrade_required: true,
            tier: "free".to_string(),
        })
    }
}

#[tokio::test]
async fn test_quota_denial_rejects_before_any_work() {
    let h = harness_with(test_config(), Arc::new(DenyAll));

    let result = h
        .service
        .process_url("https://example.com/news/h", Some("alice"), "en", ProcessOptions::default())
        .await;

    match result {
        Err(PipelineError::QuotaExceeded { status, upgrade_required, tier, .. }) => {
            assert_eq!(status, 402);
            assert!(upgrade_required);
            assert_eq!(tier, "free");
        }
        other => panic!("expected quota error, got {other:?}"),
    }
    assert_eq!(h.completion.call_count(), 0);
}
