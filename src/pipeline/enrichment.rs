//! Phase-1 enrichment: cheap concurrent lookups that improve section
//! quality without being load-bearing.
//!
//! All five lookups run concurrently under one phase deadline. Any lookup
//! may fail or time out on its own; when the whole phase runs out of time
//! the controller proceeds with conservative defaults instead.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::search_cache::SearchCache;
use super::{parse, PipelineDeps};
use crate::models::{ContentItem, UserPreferences};
use crate::providers::{with_retry, CompletionRequest, ProviderError, SearchHit, TokenUsage};
use crate::prompts::{SECTION_CLAIM_EXTRACTION, SECTION_TONE};
use crate::utils::{normalize_url, sample_segments, truncate_utf8, Deadline};

/// Cap on merged web-context entries passed into section prompts.
const MAX_CONTEXT_HITS: usize = 12;

/// Most claims searched per item.
const MAX_CLAIM_SEARCHES: usize = 5;

/// Tone sample segment size in bytes (head, middle, tail).
const TONE_SAMPLE_BYTES: usize = 600;

const TONE_WORDS: &[&str] = &[
    "serious",
    "satirical",
    "humorous",
    "promotional",
    "educational",
    "inspirational",
    "alarmist",
    "neutral",
];

/// Hosts whose content is entertainment by construction; claim extraction
/// is skipped for them.
const ENTERTAINMENT_HOSTS: &[&str] = &[
    "music.youtube.com",
    "open.spotify.com",
    "soundcloud.com",
    "tiktok.com",
];

/// Everything Phase 1 produced for Phase 2.
#[derive(Debug, Default)]
pub struct EnrichmentOutput {
    /// Merged, deduplicated search hits for the truth-check context.
    pub web_context: Vec<SearchHit>,
    pub tone: Option<String>,
    pub preferences: Option<UserPreferences>,
    /// Credibility warning for the source domain, when its history is bad.
    pub domain_warning: Option<String>,
    /// Normalized URLs observed in any search result. The citation gate
    /// only lets references through that appear here.
    pub allowed_urls: HashSet<String>,
    pub usage: TokenUsage,
    /// True when the phase deadline elapsed and defaults were used.
    pub degraded: bool,
}

/// Run all enrichment lookups under the phase deadline.
pub(super) async fn run(
    deps: &PipelineDeps,
    item: &ContentItem,
    cache: &SearchCache,
    deadline: Deadline,
) -> EnrichmentOutput {
    let gathered = tokio::time::timeout(deadline.remaining(), gather(deps, item, cache, deadline));
    match gathered.await {
        Ok(output) => output,
        Err(_) => {
            warn!("enrichment phase deadline elapsed for {}, using defaults", item.id);
            EnrichmentOutput { degraded: true, ..EnrichmentOutput::default() }
        }
    }
}

async fn gather(
    deps: &PipelineDeps,
    item: &ContentItem,
    cache: &SearchCache,
    deadline: Deadline,
) -> EnrichmentOutput {
    let (topic_hits, claim_result, tone, preferences, domain_warning) = tokio::join!(
        topic_search(deps, item, cache, deadline),
        claim_search(deps, item, cache, deadline),
        detect_tone(deps, item, deadline),
        load_preferences(deps, item),
        load_domain_warning(deps, item),
    );

    let (claim_hits, claim_usage) = claim_result;
    let (tone, tone_usage) = tone;

    let mut usage = TokenUsage::default();
    usage.add(claim_usage);
    usage.add(tone_usage);

    let mut allowed_urls = HashSet::new();
    let mut web_context = Vec::new();
    for hit in topic_hits.into_iter().chain(claim_hits) {
        let normalized = normalize_url(&hit.url);
        if allowed_urls.insert(normalized) && web_context.len() < MAX_CONTEXT_HITS {
            web_context.push(hit);
        }
    }

    debug!(
        "enrichment for {}: {} context hits, tone {:?}, domain warning: {}",
        item.id,
        web_context.len(),
        tone,
        domain_warning.is_some()
    );

    EnrichmentOutput {
        web_context,
        tone,
        preferences,
        domain_warning,
        allowed_urls,
        usage,
        degraded: false,
    }
}

/// Build 1-3 topic queries scaled to content length.
fn topic_queries(item: &ContentItem) -> Vec<String> {
    let text = item.full_text.as_deref().unwrap_or_default();
    let base = match &item.title {
        Some(title) if !title.is_empty() => title.clone(),
        _ => text.split_whitespace().take(10).collect::<Vec<_>>().join(" "),
    };
    if base.is_empty() {
        return Vec::new();
    }
    let count = if text.len() < 2_000 {
        1
    } else if text.len() < 10_000 {
        2
    } else {
        3
    };
    let mut queries = vec![base.clone()];
    if count >= 2 {
        queries.push(format!("{base} fact check"));
    }
    if count >= 3 {
        queries.push(format!("{base} context"));
    }
    queries
}

async fn topic_search(
    deps: &PipelineDeps,
    item: &ContentItem,
    cache: &SearchCache,
    deadline: Deadline,
) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for query in topic_queries(item) {
        if deadline.expired() {
            break;
        }
        match cache
            .search(deps.search.as_ref(), &query, deadline.cap(deps.config.call_timeout()))
            .await
        {
            Ok(found) => hits.extend(found),
            Err(e) => debug!("topic search {query:?} failed: {e}"),
        }
    }
    hits
}

async fn claim_search(
    deps: &PipelineDeps,
    item: &ContentItem,
    cache: &SearchCache,
    deadline: Deadline,
) -> (Vec<SearchHit>, TokenUsage) {
    let text = item.full_text.as_deref().unwrap_or_default();
    // Short posts rarely carry checkable claims worth a model call, and
    // entertainment hosts never do.
    let host = crate::utils::domain_of(&item.url).unwrap_or_default();
    if text.len() < 800 || ENTERTAINMENT_HOSTS.iter().any(|h| host.ends_with(h)) {
        return (Vec::new(), TokenUsage::default());
    }

    let (raw, usage) = match aux_completion(deps, SECTION_CLAIM_EXTRACTION, text, deadline).await {
        Ok(done) => done,
        Err(e) => {
            debug!("claim extraction failed: {e}");
            return (Vec::new(), TokenUsage::default());
        }
    };
    let claims = match parse::parse_claim_list(&raw) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("claim extraction output unusable: {e}");
            return (Vec::new(), usage);
        }
    };

    let mut hits = Vec::new();
    for claim in claims.iter().take(MAX_CLAIM_SEARCHES) {
        if deadline.expired() {
            break;
        }
        let query = truncate_utf8(claim, 120);
        match cache
            .search(deps.search.as_ref(), query, deadline.cap(deps.config.call_timeout()))
            .await
        {
            Ok(found) => hits.extend(found),
            Err(e) => debug!("claim search {query:?} failed: {e}"),
        }
    }
    (hits, usage)
}

async fn detect_tone(
    deps: &PipelineDeps,
    item: &ContentItem,
    deadline: Deadline,
) -> (Option<String>, TokenUsage) {
    let text = item.full_text.as_deref().unwrap_or_default();
    let samples = sample_segments(text, TONE_SAMPLE_BYTES);
    let (raw, usage) = match aux_completion(deps, SECTION_TONE, &samples, deadline).await {
        Ok(done) => done,
        Err(e) => {
            debug!("tone detection failed: {e}");
            return (None, TokenUsage::default());
        }
    };
    let word = raw
        .trim()
        .trim_matches(|c: char| c.is_ascii_punctuation())
        .to_lowercase();
    if TONE_WORDS.contains(&word.as_str()) {
        (Some(word), usage)
    } else {
        debug!("tone detection returned unexpected word {word:?}");
        (None, usage)
    }
}

async fn load_preferences(deps: &PipelineDeps, item: &ContentItem) -> Option<UserPreferences> {
    let user_id = item.user_id.as_deref()?;
    match deps.preferences.get(user_id) {
        Ok(prefs) => prefs,
        Err(e) => {
            warn!("preference lookup failed for {user_id}: {e}");
            None
        }
    }
}

async fn load_domain_warning(deps: &PipelineDeps, item: &ContentItem) -> Option<String> {
    let domain = crate::utils::domain_of(&item.url)?;
    match deps.domains.get(&domain) {
        Ok(Some(stats)) if stats.should_warn() => Some(stats.warning_text()),
        Ok(_) => None,
        Err(e) => {
            warn!("domain stats lookup failed for {domain}: {e}");
            None
        }
    }
}

/// Run an auxiliary (non-section) prompt against the completion provider.
async fn aux_completion(
    deps: &PipelineDeps,
    section: &str,
    content: &str,
    deadline: Deadline,
) -> Result<(String, TokenUsage), ProviderError> {
    let prompt = deps
        .prompts
        .get(section)
        .map_err(|e| ProviderError::Parse(format!("prompt {section}: {e}")))?;
    let request = CompletionRequest {
        system: prompt.system_text.clone(),
        prompt: prompt.render(&[("content", content)]),
        model: prompt.model.clone(),
        temperature: prompt.temperature,
        max_tokens: prompt.max_tokens,
        json_mode: prompt.expect_json,
    };
    let response = with_retry(section, deps.config.retry_policy(), deadline, || {
        deps.completion.complete(&request, deadline.cap(deps.config.call_timeout()))
    })
    .await?;
    Ok((response.text, response.usage))
}
