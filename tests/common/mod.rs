//! Shared test harness: scripted providers over a tempfile database.
//!
//! The mock completion provider recognizes which prompt it was handed by
//! the fixed template wording and answers with canned, valid output, so
//! whole pipeline runs execute without any network.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use veriscope::acquisition::Acquirer;
use veriscope::config::PipelineConfig;
use veriscope::pipeline::{PipelineDeps, PipelineService, QuotaGate, UnlimitedQuota};
use veriscope::prompts::{PromptStore, SystemClock};
use veriscope::providers::{
    CompletionProvider, CompletionRequest, CompletionResponse, ProviderError, ScrapeProvider,
    ScrapedPage, SearchHit, SearchProvider, TokenUsage, TranscriptProvider, TranscriptSegment,
    TranscriptionProvider, VideoMetadata, VideoMetadataProvider,
};
use veriscope::repository::{
    ClaimRepository, ContentRepository, DomainStatsRepository, ModerationRepository,
    PreferenceRepository, PromptRepository, SummaryRepository,
};

/// Identify which prompt a completion request renders, by the fixed
/// wording of the built-in templates.
fn section_of(request: &CompletionRequest) -> &'static str {
    let p = &request.prompt;
    if p.contains("dominant tone") {
        "tone_detection"
    } else if p.contains("verifiable factual claims") {
        "claim_extraction"
    } else if p.contains("Classify this content") {
        "triage"
    } else if p.contains("single tight paragraph") {
        "overview"
    } else if p.contains("2-3 paragraphs") {
        "mid_summary"
    } else if p.contains("detailed structured summary") {
        "detailed_summary"
    } else if p.contains("search tags") {
        "auto_tags"
    } else if p.contains("Fact-check this content") {
        "truth_check"
    } else if p.contains("actionable takeaways") {
        "action_items"
    } else {
        "unknown"
    }
}

fn default_response(section: &str) -> String {
    match section {
        "tone_detection" => "serious".to_string(),
        "claim_extraction" => {
            r#"["The budget bill passed the senate on Thursday"]"#.to_string()
        }
        "triage" => {
            r#"{"category": "news", "quality_score": 70, "audience": "general", "density": "moderate"}"#
                .to_string()
        }
        "overview" => {
            "A news report on the budget bill's passage through the senate.".to_string()
        }
        "mid_summary" => {
            "The bill passed after a long debate. Lawmakers argued over amendments before the final vote."
                .to_string()
        }
        "detailed_summary" => {
            "## Passage\nThe senate passed the budget bill on Thursday after debate.".to_string()
        }
        "auto_tags" => r#"["budget", "senate"]"#.to_string(),
        "truth_check" => {
            r#"{"overall_rating": "mostly_accurate", "quality_score": 75, "assessment": "The core claim is confirmed [1].", "claims": [{"claim": "The budget bill passed the senate", "status": "verified", "severity": "low", "explanation": "Matches coverage [1].", "source_indexes": [1]}], "issues": [], "references": ["https://news.example/budget"]}"#
                .to_string()
        }
        "action_items" => {
            r#"{"items": [{"action": "Read the final bill text", "detail": "The amendments changed several provisions."}]}"#
                .to_string()
        }
        _ => "Unexpected prompt.".to_string(),
    }
}

/// Scripted AI provider. Answers per recognized prompt; individual
/// sections can be overridden or made to fail.
pub struct MockCompletion {
    pub calls: AtomicU32,
    overrides: Mutex<HashMap<&'static str, String>>,
    failing: Mutex<HashSet<&'static str>>,
    fail_first: Mutex<HashMap<&'static str, u32>>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
            overrides: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            fail_first: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_response(&self, section: &'static str, text: &str) {
        self.overrides.lock().unwrap().insert(section, text.to_string());
    }

    /// Every call for this section fails with a 500.
    pub fn fail_section(&self, section: &'static str) {
        self.failing.lock().unwrap().insert(section);
    }

    /// The first `n` calls for this section fail, later calls succeed.
    pub fn fail_first(&self, section: &'static str, n: u32) {
        self.fail_first.lock().unwrap().insert(section, n);
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for MockCompletion {
    async fn complete(
        &self,
        request: &CompletionRequest,
        _budget: Duration,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let section = section_of(request);

        if self.failing.lock().unwrap().contains(section) {
            return Err(ProviderError::Http { status: 500, message: "scripted failure".to_string() });
        }
        {
            let mut fail_first = self.fail_first.lock().unwrap();
            if let Some(left) = fail_first.get_mut(section) {
                if *left > 0 {
                    *left -= 1;
                    return Err(ProviderError::Http {
                        status: 500,
                        message: "scripted failure".to_string(),
                    });
                }
            }
        }

        let text = self
            .overrides
            .lock()
            .unwrap()
            .get(section)
            .cloned()
            .unwrap_or_else(|| default_response(section));
        Ok(CompletionResponse {
            text,
            usage: TokenUsage { prompt_tokens: 100, completion_tokens: 50 },
        })
    }
}

/// Search provider returning a fixed hit list for every query.
pub struct MockSearch {
    pub calls: AtomicU32,
    pub hits: Mutex<Vec<SearchHit>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
            hits: Mutex::new(vec![
                SearchHit {
                    title: "Budget coverage".to_string(),
                    url: "https://news.example/budget".to_string(),
                    snippet: "The senate passed the budget bill on Thursday.".to_string(),
                },
                SearchHit {
                    title: "Bill fact check".to_string(),
                    url: "https://factcheck.example/bill".to_string(),
                    snippet: "Claims about the bill, checked.".to_string(),
                },
            ]),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(
        &self,
        _query: &str,
        _budget: Duration,
    ) -> Result<Vec<SearchHit>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.hits.lock().unwrap().clone())
    }
}

/// Article body long enough to pass the length checks and trigger the
/// claim-extraction path.
pub fn article_text() -> String {
    "The budget bill passed the senate on Thursday after a long floor debate. ".repeat(18)
}

pub struct MockScrape {
    pub calls: AtomicU32,
    pub text: Mutex<String>,
    pub fail: AtomicBool,
}

impl MockScrape {
    pub fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
            text: Mutex::new(article_text()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_text(&self, text: &str) {
        *self.text.lock().unwrap() = text.to_string();
    }
}

#[async_trait]
impl ScrapeProvider for MockScrape {
    async fn scrape(&self, _url: &str, _budget: Duration) -> Result<ScrapedPage, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Http { status: 403, message: "forbidden".to_string() });
        }
        Ok(ScrapedPage {
            title: Some("Budget bill passes".to_string()),
            text: self.text.lock().unwrap().clone(),
        })
    }
}

pub struct MockVideoMetadata;

#[async_trait]
impl VideoMetadataProvider for MockVideoMetadata {
    async fn metadata(
        &self,
        _url: &str,
        _budget: Duration,
    ) -> Result<VideoMetadata, ProviderError> {
        Ok(VideoMetadata {
            title: Some("Budget hearing".to_string()),
            author: Some("Capitol Channel".to_string()),
            duration_secs: Some(95),
            view_count: Some(12_000),
        })
    }
}

pub struct MockTranscript {
    pub segments: Mutex<Vec<TranscriptSegment>>,
}

impl MockTranscript {
    pub fn new() -> Self {
        Self {
            segments: Mutex::new(vec![
                TranscriptSegment {
                    start_secs: 0.0,
                    text: "The committee opened the hearing with remarks on the budget."
                        .to_string(),
                },
                TranscriptSegment {
                    start_secs: 31.0,
                    text: "Members debated the amendment for most of the session.".to_string(),
                },
            ]),
        }
    }

    pub fn clear(&self) {
        self.segments.lock().unwrap().clear();
    }
}

#[async_trait]
impl TranscriptProvider for MockTranscript {
    async fn transcript(
        &self,
        _url: &str,
        _budget: Duration,
    ) -> Result<Vec<TranscriptSegment>, ProviderError> {
        Ok(self.segments.lock().unwrap().clone())
    }
}

pub struct MockTranscription {
    pub last_callback: Mutex<Option<String>>,
}

impl MockTranscription {
    pub fn new() -> Self {
        Self { last_callback: Mutex::new(None) }
    }
}

#[async_trait]
impl TranscriptionProvider for MockTranscription {
    async fn submit(
        &self,
        _audio_url: &str,
        callback_url: Option<&str>,
        _budget: Duration,
    ) -> Result<String, ProviderError> {
        *self.last_callback.lock().unwrap() = callback_url.map(str::to_string);
        Ok("job-42".to_string())
    }
}

/// Fast pipeline timings for tests.
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        pipeline_budget_secs: 30,
        enrichment_budget_secs: 10,
        call_timeout_secs: 5,
        acquisition_timeout_secs: 5,
        max_attempts: 2,
        base_delay_ms: 1,
        rate_limit_multiplier: 2,
        prompt_cache_ttl_secs: 300,
    }
}

pub struct Harness {
    pub service: PipelineService,
    pub completion: Arc<MockCompletion>,
    pub search: Arc<MockSearch>,
    pub scraper: Arc<MockScrape>,
    pub transcript: Arc<MockTranscript>,
    pub transcription: Arc<MockTranscription>,
    _dir: TempDir,
}

pub fn harness() -> Harness {
    harness_with(test_config(), Arc::new(UnlimitedQuota))
}

pub fn harness_with(config: PipelineConfig, quota: Arc<dyn QuotaGate>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("test.db");

    let prompt_repo = PromptRepository::new(&db).unwrap();
    let prompts = Arc::new(PromptStore::new(
        prompt_repo,
        config.prompt_cache_ttl(),
        Arc::new(SystemClock),
    ));
    prompts.seed_defaults().unwrap();

    let completion = Arc::new(MockCompletion::new());
    let search = Arc::new(MockSearch::new());
    let scraper = Arc::new(MockScrape::new());
    let transcript = Arc::new(MockTranscript::new());
    let transcription = Arc::new(MockTranscription::new());

    let acquirer = Acquirer {
        video_metadata: Arc::new(MockVideoMetadata),
        transcripts: transcript.clone(),
        scraper: scraper.clone(),
        transcription: transcription.clone(),
        retry: config.retry_policy(),
        call_timeout: config.acquisition_timeout(),
    };

    let deps = PipelineDeps {
        content: ContentRepository::new(&db).unwrap(),
        summaries: SummaryRepository::new(&db).unwrap(),
        claims: ClaimRepository::new(&db).unwrap(),
        domains: DomainStatsRepository::new(&db).unwrap(),
        moderation: ModerationRepository::new(&db).unwrap(),
        preferences: PreferenceRepository::new(&db).unwrap(),
        prompts,
        completion: completion.clone(),
        search: search.clone(),
        acquirer,
        quota,
        transcription_callback: Some("https://api.test/webhooks/transcription".to_string()),
        config,
    };

    Harness {
        service: PipelineService::new(deps),
        completion,
        search,
        scraper,
        transcript,
        transcription,
        _dir: dir,
    }
}
