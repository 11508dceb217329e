//! The analysis pipeline controller.
//!
//! One run moves a content item through acquisition, the cross-user
//! cache, Phase-1 enrichment, Phase-2 section generation, and
//! post-processing, under three nested timeout layers: the whole-run
//! deadline, per-phase budgets, and per-call timeouts. Acquisition
//! failures and section failures are soft; the run reports what it
//! managed to produce.

mod cache;
mod enrichment;
mod moderation;
mod parse;
mod postprocess;
mod search_cache;
mod sections;

pub use cache::CacheOutcome;
pub use enrichment::EnrichmentOutput;
pub use parse::{
    ActionItem, ActionItemsResult, TriageResult, TruthCheckResult, TruthClaim, TruthIssue,
};
pub use search_cache::SearchCache;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::acquisition::{AcquireOutcome, Acquirer};
use crate::config::PipelineConfig;
use crate::models::{
    ContentItem, FailureCategory, ModerationFlag, ProcessingStatus, SectionKind,
};
use crate::prompts::PromptStore;
use crate::providers::{CompletionProvider, RetryPolicy, SearchProvider, TokenUsage};
use crate::repository::{
    ClaimRepository, ContentRepository, DomainStatsRepository, ModerationRepository,
    PreferenceRepository, RepositoryError, SummaryRepository,
};
use crate::utils::{normalize_url, truncate_utf8, Deadline};

/// Why a processing request was rejected outright.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("content {0} not found")]
    NotFound(String),
    #[error("{message}")]
    QuotaExceeded {
        message: String,
        /// HTTP-style status the API layer should surface (402 or 429).
        status: u16,
        upgrade_required: bool,
        tier: String,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A denied quota check.
#[derive(Debug, Clone)]
pub struct QuotaDenied {
    pub message: String,
    pub status: u16,
    pub upgrade_required: bool,
    pub tier: String,
}

/// Usage-limit hook consulted once per processing request.
///
/// Billing and plans live outside this crate; deployments plug their own
/// gate in here.
#[async_trait]
pub trait QuotaGate: Send + Sync {
    async fn check_and_count(&self, user_id: Option<&str>) -> Result<(), QuotaDenied>;
}

/// Gate that never denies.
pub struct UnlimitedQuota;

#[async_trait]
impl QuotaGate for UnlimitedQuota {
    async fn check_and_count(&self, _user_id: Option<&str>) -> Result<(), QuotaDenied> {
        Ok(())
    }
}

/// Per-request processing options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    /// Clear existing sections and bypass the cross-user cache.
    pub force_regenerate: bool,
    /// Analyze only text already on the item; never fetch.
    pub skip_acquisition: bool,
}

/// What one processing request produced.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub content_id: String,
    pub status: ProcessingStatus,
    /// True when a cross-user cache hit supplied the whole analysis.
    pub cached: bool,
    pub sections: Vec<String>,
    pub language: String,
    pub paywall_warning: bool,
    /// User-facing explanation when acquisition or moderation failed.
    pub failure_message: Option<String>,
    pub tokens: TokenUsage,
}

impl ProcessOutcome {
    fn new(item: &ContentItem, status: ProcessingStatus) -> Self {
        Self {
            content_id: item.id.clone(),
            status,
            cached: false,
            sections: Vec::new(),
            language: item.analysis_language.clone(),
            paywall_warning: false,
            failure_message: None,
            tokens: TokenUsage::default(),
        }
    }
}

/// Everything a pipeline run needs, shared across runs.
pub struct PipelineDeps {
    pub content: ContentRepository,
    pub summaries: SummaryRepository,
    pub claims: ClaimRepository,
    pub domains: DomainStatsRepository,
    pub moderation: ModerationRepository,
    pub preferences: PreferenceRepository,
    pub prompts: Arc<PromptStore>,
    pub completion: Arc<dyn CompletionProvider>,
    pub search: Arc<dyn SearchProvider>,
    pub acquirer: Acquirer,
    pub quota: Arc<dyn QuotaGate>,
    /// Public webhook URL handed to the transcription provider.
    pub transcription_callback: Option<String>,
    pub config: PipelineConfig,
}

/// The pipeline entry point.
#[derive(Clone)]
pub struct PipelineService {
    deps: Arc<PipelineDeps>,
}

impl PipelineService {
    pub fn new(deps: PipelineDeps) -> Self {
        Self { deps: Arc::new(deps) }
    }

    pub fn deps(&self) -> &Arc<PipelineDeps> {
        &self.deps
    }

    /// Process a URL for a user: resolve or create the content item, then
    /// run the pipeline on it.
    pub async fn process_url(
        &self,
        url: &str,
        user_id: Option<&str>,
        language: &str,
        options: ProcessOptions,
    ) -> Result<ProcessOutcome, PipelineError> {
        if let Err(denied) = self.deps.quota.check_and_count(user_id).await {
            return Err(PipelineError::QuotaExceeded {
                message: denied.message,
                status: denied.status,
                upgrade_required: denied.upgrade_required,
                tier: denied.tier,
            });
        }

        let normalized = normalize_url(url);
        let mut item = match self.deps.content.get_by_url_for_user(&normalized, user_id)? {
            Some(existing) => existing,
            None => {
                let item = ContentItem::new(url, user_id.map(|s| s.to_string()), language);
                self.deps.content.save(&item)?;
                item
            }
        };

        // Repeat requests without force are no-ops once complete.
        if !options.force_regenerate {
            if let Some(summary) = self.deps.summaries.get(&item.id, language)? {
                if summary.processing_status == ProcessingStatus::Complete {
                    let mut outcome = ProcessOutcome::new(&item, ProcessingStatus::Complete);
                    outcome.cached = true;
                    outcome.sections =
                        summary.present_sections().iter().map(|s| s.to_string()).collect();
                    return Ok(outcome);
                }
                if summary.processing_status == ProcessingStatus::Transcribing {
                    return Ok(ProcessOutcome::new(&item, ProcessingStatus::Transcribing));
                }
            }
        }

        self.run(&mut item, options).await
    }

    /// Webhook re-entry: a transcription job finished; store the text and
    /// run the analysis phases that were waiting on it.
    pub async fn resume_transcription(
        &self,
        content_id: &str,
        transcript: &str,
    ) -> Result<ProcessOutcome, PipelineError> {
        let mut item = self
            .deps
            .content
            .get(content_id)?
            .ok_or_else(|| PipelineError::NotFound(content_id.to_string()))?;

        if transcript.trim().is_empty() {
            item.mark_failed(FailureCategory::TranscriptionFailed);
            self.deps.content.save(&item)?;
            self.deps.summaries.set_status(
                &item.id,
                &item.analysis_language,
                ProcessingStatus::None,
            )?;
            let mut outcome = ProcessOutcome::new(&item, ProcessingStatus::None);
            outcome.failure_message =
                Some(FailureCategory::TranscriptionFailed.user_message().to_string());
            return Ok(outcome);
        }

        item.full_text = Some(transcript.to_string());
        self.deps.content.save(&item)?;
        info!("transcript received for {content_id}, resuming analysis");

        let deadline = Deadline::after(self.deps.config.pipeline_budget());
        self.analyze(&mut item, false, deadline).await
    }

    /// Run the pipeline on an item the caller already resolved.
    async fn run(
        &self,
        item: &mut ContentItem,
        options: ProcessOptions,
    ) -> Result<ProcessOutcome, PipelineError> {
        let deps = &self.deps;
        let language = item.analysis_language.clone();
        let deadline = Deadline::after(deps.config.pipeline_budget());

        if options.force_regenerate {
            deps.summaries.clear(&item.id, &language)?;
        } else {
            match cache::resolve(&deps.content, &deps.summaries, &deps.claims, item)? {
                CacheOutcome::Full { sections } => {
                    let mut outcome = ProcessOutcome::new(item, ProcessingStatus::Complete);
                    outcome.cached = true;
                    outcome.sections = sections;
                    return Ok(outcome);
                }
                CacheOutcome::TextOnly | CacheOutcome::Miss => {}
            }
        }

        let mut paywall_warning = false;
        let needs_text = !item.has_usable_text()
            || (options.force_regenerate && item.failure_category().is_some());
        if needs_text && !options.skip_acquisition {
            if options.force_regenerate {
                // A forced run retries a previously failed acquisition.
                item.full_text = None;
            }
            // The webhook needs to know which item a transcript belongs to.
            let callback = deps
                .transcription_callback
                .as_ref()
                .map(|base| format!("{base}?content_id={}", item.id));
            let outcome = deps.acquirer.acquire(item, deadline, callback.as_deref()).await;
            deps.content.save(item)?;
            match outcome {
                AcquireOutcome::Acquired { paywall_warning: warned } => {
                    paywall_warning = warned;
                }
                AcquireOutcome::Transcribing { .. } => {
                    deps.summaries.set_status(&item.id, &language, ProcessingStatus::Transcribing)?;
                    return Ok(ProcessOutcome::new(item, ProcessingStatus::Transcribing));
                }
                AcquireOutcome::Failed(category) => {
                    let mut outcome = ProcessOutcome::new(item, ProcessingStatus::None);
                    outcome.failure_message = Some(category.user_message().to_string());
                    return Ok(outcome);
                }
            }
        }

        if !item.has_usable_text() {
            let category = item.failure_category().unwrap_or(FailureCategory::TooShort);
            let mut outcome = ProcessOutcome::new(item, ProcessingStatus::None);
            outcome.failure_message = Some(category.user_message().to_string());
            return Ok(outcome);
        }

        let mut outcome = self.analyze(item, paywall_warning, deadline).await?;
        outcome.paywall_warning = paywall_warning;
        Ok(outcome)
    }

    /// Phases 1-3 on an item that has usable text.
    async fn analyze(
        &self,
        item: &mut ContentItem,
        paywall_warning: bool,
        deadline: Deadline,
    ) -> Result<ProcessOutcome, PipelineError> {
        let deps = self.deps.clone();
        let language = item.analysis_language.clone();
        let text = item.full_text.clone().unwrap_or_default();

        if let Some(reason) = moderation::pre_screen(item.title.as_deref(), &text) {
            warn!("moderation pre-screen blocked {}: {reason}", item.id);
            deps.moderation.add(&ModerationFlag::new(
                &item.id,
                "pre_screen",
                reason,
                truncate_utf8(&text, 500),
            ))?;
            item.mark_failed(FailureCategory::PolicyViolation);
            deps.content.save(item)?;
            deps.summaries.set_status(&item.id, &language, ProcessingStatus::Refused)?;
            let mut outcome = ProcessOutcome::new(item, ProcessingStatus::Refused);
            outcome.failure_message =
                Some(FailureCategory::PolicyViolation.user_message().to_string());
            return Ok(outcome);
        }

        let mut tokens = TokenUsage::default();

        deps.summaries.set_status(&item.id, &language, ProcessingStatus::Enriching)?;
        let search_cache = SearchCache::new();
        let enrich_deadline = deadline.child(deps.config.enrichment_budget());
        let enrich = enrichment::run(&deps, item, &search_cache, enrich_deadline).await;
        tokens.add(enrich.usage);
        if let Some(tone) = &enrich.tone {
            item.detected_tone = Some(tone.clone());
        }

        deps.summaries.set_status(&item.id, &language, ProcessingStatus::Generating)?;
        let enrich = Arc::new(enrich);
        let generated = tokio::time::timeout(
            deadline.remaining(),
            sections::generate_all(
                deps.clone(),
                Arc::new(item.clone()),
                enrich.clone(),
                deadline,
            ),
        )
        .await;

        let mut outcomes = match generated {
            Ok(outcomes) => outcomes,
            Err(_) => {
                // Whatever sections persisted from inside their tasks stand.
                warn!("pipeline deadline elapsed during generation for {}", item.id);
                deps.content.save(item)?;
                return self.finish(item, &language, true, paywall_warning, tokens);
            }
        };
        for outcome in &outcomes {
            tokens.add(outcome.usage);
        }

        self.record_refusals(item, &outcomes)?;
        self.self_heal(item, &enrich, &mut outcomes, deadline, &mut tokens).await?;

        let triage = outcomes
            .iter()
            .find(|o| o.kind == SectionKind::Triage)
            .and_then(|o| o.result.as_ref().ok())
            .and_then(|v| parse::parse_triage(v).ok());
        let entertainment = triage.as_ref().is_some_and(|t| t.is_entertainment());
        if entertainment {
            info!(
                "{} triaged as {}, skipping truth-check and action items",
                item.id,
                triage.as_ref().map(|t| t.category.as_str()).unwrap_or_default()
            );
        }

        if !entertainment {
            self.finalize_truth_check(item, &enrich, &outcomes)?;
            if let Some(value) = section_value(&outcomes, SectionKind::ActionItems) {
                deps.summaries.upsert_section(
                    &item.id,
                    &language,
                    SectionKind::ActionItems,
                    value,
                )?;
            }
        }

        if let Some(tags_json) = section_value(&outcomes, SectionKind::AutoTags) {
            if let Ok(tags) = serde_json::from_str::<Vec<String>>(tags_json) {
                item.tags = tags;
            }
        }
        deps.content.save(item)?;

        self.finish(item, &language, false, paywall_warning, tokens)
    }

    /// Record moderation flags for sections the model refused.
    fn record_refusals(
        &self,
        item: &ContentItem,
        outcomes: &[sections::SectionOutcome],
    ) -> Result<(), PipelineError> {
        for outcome in outcomes {
            if let Err(sections::SectionFailure::Refusal(text)) = &outcome.result {
                self.deps.moderation.add(&ModerationFlag::new(
                    &item.id,
                    outcome.kind.as_str(),
                    "model refusal",
                    text,
                ))?;
            }
        }
        Ok(())
    }

    /// One extra attempt for failed critical sections, with the full text
    /// and no retries. Refusals are not retried.
    async fn self_heal(
        &self,
        item: &ContentItem,
        enrich: &EnrichmentOutput,
        outcomes: &mut [sections::SectionOutcome],
        deadline: Deadline,
        tokens: &mut TokenUsage,
    ) -> Result<(), PipelineError> {
        let heal_policy = RetryPolicy { max_attempts: 1, ..self.deps.config.retry_policy() };
        for outcome in outcomes.iter_mut() {
            if !outcome.kind.is_critical() || deadline.expired() {
                continue;
            }
            if !matches!(outcome.result, Err(sections::SectionFailure::Provider(_))) {
                continue;
            }
            info!("self-heal attempt for section {} on {}", outcome.kind.as_str(), item.id);
            match sections::generate_one(
                &self.deps,
                item,
                enrich,
                outcome.kind,
                true,
                heal_policy,
                deadline,
            )
            .await
            {
                Ok((value, usage)) => {
                    tokens.add(usage);
                    self.deps.summaries.upsert_section(
                        &item.id,
                        &item.analysis_language,
                        outcome.kind,
                        &value,
                    )?;
                    outcome.result = Ok(value);
                }
                Err(e) => {
                    warn!("self-heal for {} failed: {e}", outcome.kind.as_str());
                }
            }
        }
        Ok(())
    }

    /// Gate, persist, and index the truth-check output.
    fn finalize_truth_check(
        &self,
        item: &ContentItem,
        enrich: &EnrichmentOutput,
        outcomes: &[sections::SectionOutcome],
    ) -> Result<(), PipelineError> {
        let Some(value) = section_value(outcomes, SectionKind::TruthCheck) else {
            return Ok(());
        };
        let mut truth = match parse::parse_truth_check(value) {
            Ok(truth) => truth,
            Err(e) => {
                warn!("stored truth-check unparseable for {}: {e}", item.id);
                return Ok(());
            }
        };

        let dropped = postprocess::apply_citation_gate(&mut truth, &enrich.allowed_urls);
        if dropped > 0 {
            info!("citation gate dropped {dropped} fabricated references for {}", item.id);
        }

        let canonical = serde_json::to_string(&truth)
            .map_err(|e| RepositoryError::Corrupt(format!("truth-check serialize: {e}")))?;
        self.deps.summaries.upsert_section(
            &item.id,
            &item.analysis_language,
            SectionKind::TruthCheck,
            &canonical,
        )?;

        let claims = postprocess::claims_from_truth(item, &truth);
        self.deps.claims.replace_for_content(&item.id, &claims)?;
        postprocess::domain_feedback(&self.deps.domains, item, &truth)?;
        Ok(())
    }

    /// Read back the summary row, settle the final status, and build the
    /// outcome.
    fn finish(
        &self,
        item: &ContentItem,
        language: &str,
        timed_out: bool,
        paywall_warning: bool,
        tokens: TokenUsage,
    ) -> Result<ProcessOutcome, PipelineError> {
        let summary = self
            .deps
            .summaries
            .get(&item.id, language)?
            .ok_or_else(|| RepositoryError::Corrupt(format!("no summary row for {}", item.id)))?;
        let sections: Vec<String> =
            summary.present_sections().iter().map(|s| s.to_string()).collect();

        let status = if timed_out || sections.is_empty() {
            ProcessingStatus::Partial
        } else {
            ProcessingStatus::Complete
        };
        self.deps.summaries.set_status(&item.id, language, status)?;

        info!(
            "pipeline finished for {}: status {}, {} sections, {} tokens",
            item.id,
            status.as_str(),
            sections.len(),
            tokens.total()
        );

        let mut outcome = ProcessOutcome::new(item, status);
        outcome.sections = sections;
        outcome.paywall_warning = paywall_warning;
        outcome.tokens = tokens;
        Ok(outcome)
    }
}

fn section_value(outcomes: &[sections::SectionOutcome], kind: SectionKind) -> Option<&str> {
    outcomes
        .iter()
        .find(|o| o.kind == kind)
        .and_then(|o| o.result.as_deref().ok())
}
