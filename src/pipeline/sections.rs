//! Phase-2 section generation: seven concurrent AI tasks.
//!
//! Tasks are spawned together and settled, never cancelled on a sibling's
//! failure. Each successful non-gated section is persisted immediately
//! from inside its task, so a later timeout or crash loses nothing that
//! already finished. Truth-check and action-items are gated on the triage
//! category and persist in post-processing instead.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, warn};

use super::enrichment::EnrichmentOutput;
use super::{moderation, parse, PipelineDeps};
use crate::models::{ContentItem, SectionKind};
use crate::providers::{with_retry, CompletionRequest, ProviderError, RetryPolicy, TokenUsage};
use crate::repository::RepositoryError;
use crate::utils::{format_timestamp, truncate_utf8, Deadline};

/// Cap on the rendered verification context, in characters.
const MAX_CONTEXT_CHARS: usize = 8_000;

/// Why a section produced nothing usable.
#[derive(Debug)]
pub(super) enum SectionFailure {
    Provider(ProviderError),
    /// The model refused instead of producing the section.
    Refusal(String),
    Storage(RepositoryError),
}

impl std::fmt::Display for SectionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provider(e) => write!(f, "provider: {e}"),
            Self::Refusal(_) => write!(f, "model refusal"),
            Self::Storage(e) => write!(f, "storage: {e}"),
        }
    }
}

/// Settled result of one section task.
#[derive(Debug)]
pub(super) struct SectionOutcome {
    pub kind: SectionKind,
    pub result: Result<String, SectionFailure>,
    pub usage: TokenUsage,
}

/// Sections persisted from inside their task. The gated ones wait for the
/// triage category in post-processing.
pub(super) fn persists_immediately(kind: SectionKind) -> bool {
    !matches!(kind, SectionKind::TruthCheck | SectionKind::ActionItems)
}

/// Spawn all seven section tasks and settle them.
pub(super) async fn generate_all(
    deps: Arc<PipelineDeps>,
    item: Arc<ContentItem>,
    enrich: Arc<EnrichmentOutput>,
    deadline: Deadline,
) -> Vec<SectionOutcome> {
    let handles: Vec<_> = SectionKind::ALL
        .into_iter()
        .map(|kind| {
            let deps = deps.clone();
            let item = item.clone();
            let enrich = enrich.clone();
            tokio::spawn(async move { run_section(&deps, &item, &enrich, kind, deadline).await })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (kind, joined) in SectionKind::ALL.into_iter().zip(join_all(handles).await) {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                error!("section task {} panicked: {e}", kind.as_str());
                outcomes.push(SectionOutcome {
                    kind,
                    result: Err(SectionFailure::Provider(ProviderError::Parse(format!(
                        "task failed: {e}"
                    )))),
                    usage: TokenUsage::default(),
                });
            }
        }
    }
    outcomes
}

async fn run_section(
    deps: &PipelineDeps,
    item: &ContentItem,
    enrich: &EnrichmentOutput,
    kind: SectionKind,
    deadline: Deadline,
) -> SectionOutcome {
    let policy = deps.config.retry_policy();
    let (value, usage) = match generate_one(deps, item, enrich, kind, false, policy, deadline).await
    {
        Ok(done) => done,
        Err(e) => {
            warn!("section {} failed for {}: {e}", kind.as_str(), item.id);
            return SectionOutcome {
                kind,
                result: Err(SectionFailure::Provider(e)),
                usage: TokenUsage::default(),
            };
        }
    };

    // JSON sections cannot smuggle a refusal past their schema; prose can.
    if !kind.expects_json() && moderation::detect_refusal(&value) {
        warn!("section {} for {} came back as a refusal", kind.as_str(), item.id);
        return SectionOutcome { kind, result: Err(SectionFailure::Refusal(value)), usage };
    }

    if persists_immediately(kind) {
        if let Err(e) =
            deps.summaries
                .upsert_section(&item.id, &item.analysis_language, kind, &value)
        {
            error!("persisting section {} for {} failed: {e}", kind.as_str(), item.id);
            return SectionOutcome { kind, result: Err(SectionFailure::Storage(e)), usage };
        }
        info!("section {} persisted for {}", kind.as_str(), item.id);
    }

    SectionOutcome { kind, result: Ok(value), usage }
}

/// Generate and validate one section.
///
/// `use_full_text` lifts the slice cap for the self-heal retry, which
/// trades cost for a second chance at a critical section.
pub(super) async fn generate_one(
    deps: &PipelineDeps,
    item: &ContentItem,
    enrich: &EnrichmentOutput,
    kind: SectionKind,
    use_full_text: bool,
    policy: RetryPolicy,
    deadline: Deadline,
) -> Result<(String, TokenUsage), ProviderError> {
    let prompt = deps
        .prompts
        .get(kind.as_str())
        .map_err(|e| ProviderError::Parse(format!("prompt {}: {e}", kind.as_str())))?;

    let text = item.full_text.as_deref().unwrap_or_default();
    let content = if use_full_text {
        text
    } else {
        truncate_utf8(text, kind.slice_limit())
    };

    let metadata = metadata_block(item);
    let tone = enrich.tone.as_deref().unwrap_or("neutral");
    let instructions = enrich
        .preferences
        .as_ref()
        .and_then(|p| p.prompt_block())
        .unwrap_or_default();
    let context = if kind == SectionKind::TruthCheck {
        verification_context(enrich)
    } else {
        String::new()
    };

    let system = fill(
        &prompt.system_text,
        &[
            ("language", item.analysis_language.as_str()),
            ("tone", tone),
            ("metadata", &metadata),
            ("instructions", &instructions),
        ],
    );
    let user = prompt.render(&[
        ("content", content),
        ("context", &context),
        ("title", item.title.as_deref().unwrap_or("")),
        ("language", item.analysis_language.as_str()),
    ]);

    let request = CompletionRequest {
        system,
        prompt: user,
        model: prompt.model.clone(),
        temperature: prompt.temperature,
        max_tokens: prompt.max_tokens,
        json_mode: prompt.expect_json,
    };

    // Validation runs inside the retry loop so malformed output gets the
    // same retry budget as a 5xx.
    with_retry(kind.as_str(), policy, deadline, || async {
        let response = deps
            .completion
            .complete(&request, deadline.cap(deps.config.call_timeout()))
            .await?;
        let value = parse::validate_section(kind, &response.text)?;
        Ok((value, response.usage))
    })
    .await
}

/// Substitute `{placeholder}` variables in a template fragment.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

/// Render item metadata as prompt-ready lines.
fn metadata_block(item: &ContentItem) -> String {
    let mut lines = vec![format!("Type: {}", item.source_type.as_str())];
    if let Some(title) = &item.title {
        lines.push(format!("Title: {title}"));
    }
    if let Some(author) = &item.author {
        lines.push(format!("Author: {author}"));
    }
    if let Some(duration) = item.duration_secs {
        lines.push(format!("Duration: {}", format_timestamp(duration.max(0) as u64)));
    }
    if let Some(views) = item.view_count {
        lines.push(format!("Views: {views}"));
    }
    lines.push(format!("URL: {}", item.url));
    lines.join("\n")
}

/// Render the numbered verification context for the truth-check prompt.
fn verification_context(enrich: &EnrichmentOutput) -> String {
    let mut parts = Vec::new();
    if let Some(warning) = &enrich.domain_warning {
        parts.push(warning.clone());
    }
    if enrich.web_context.is_empty() {
        parts.push(
            "No verification context is available. Mark claims unverified rather than guessing."
                .to_string(),
        );
    } else {
        for (i, hit) in enrich.web_context.iter().enumerate() {
            parts.push(format!("[{}] {} — {}\n    {}", i + 1, hit.title, hit.url, hit.snippet));
        }
    }
    let joined = parts.join("\n");
    truncate_utf8(&joined, MAX_CONTEXT_CHARS).to_string()
}
