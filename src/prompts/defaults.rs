//! Built-in prompt templates, seeded into the database on `init`.
//!
//! Templates use `{placeholder}` substitution: `{content}`, `{title}`,
//! `{language}`, `{tone}`, `{metadata}`, `{instructions}`, `{context}`.

use chrono::Utc;

use crate::models::AnalysisPrompt;

/// Auxiliary prompt key for tone detection.
pub const SECTION_TONE: &str = "tone_detection";

/// Auxiliary prompt key for verifiable-claim extraction.
pub const SECTION_CLAIM_EXTRACTION: &str = "claim_extraction";

const SHARED_PREAMBLE: &str = r#"You are analyzing content a user saved for later review. Write in {language}. The content's tone is {tone}; keep that in mind when judging intent (satire is not misinformation).

Content metadata:
{metadata}

{instructions}"#;

const OVERVIEW_TEMPLATE: &str = r#"Write a single tight paragraph (3-5 sentences) answering: what is this content about, who made it, and why would it matter to the reader? No preamble, no headings.

Content:
{content}"#;

const TRIAGE_TEMPLATE: &str = r#"Classify this content. Respond with ONLY a JSON object:
{"category": "<news|opinion|educational|entertainment|music|product|politics|science|health|finance|other>", "quality_score": <0-100>, "audience": "<general|specialist|children>", "density": "<light|moderate|dense>"}

quality_score reflects information quality, not production value. Music videos, comedy and other entertainment get category "music" or "entertainment" even when they mention real events.

Content:
{content}"#;

const MID_SUMMARY_TEMPLATE: &str = r#"Summarize this content in 2-3 paragraphs. Cover the main argument or narrative, the key evidence or moments, and the conclusion. Plain prose, no bullet points.

Content:
{content}"#;

const DETAILED_SUMMARY_TEMPLATE: &str = r#"Write a detailed structured summary of this content. Use short section headings, cover every major segment in order, and keep timestamps like [MM:SS] when the content includes them so readers can jump to the source.

Content:
{content}"#;

const AUTO_TAGS_TEMPLATE: &str = r#"Generate 3-6 search tags for this content. Respond with ONLY a JSON array of lowercase strings, hyphenated for multi-word tags, e.g. ["climate-policy", "interview"]. Be specific: "federal-reserve" is better than "economics". No vague tags like "video" or "information".

Content:
{content}"#;

const TRUTH_CHECK_TEMPLATE: &str = r#"Fact-check this content against the verification context below. Respond with ONLY a JSON object:
{"overall_rating": "<accurate|mostly_accurate|mixed|questionable|unreliable>", "quality_score": <0-100>, "assessment": "<2-4 sentence verdict, cite sources as [1], [2]...>", "claims": [{"claim": "...", "status": "<verified|false|misleading|unverified>", "severity": "<high|medium|low>", "explanation": "...", "source_indexes": [1]}], "issues": [{"issue": "...", "severity": "<high|medium|low>"}], "references": ["<url>", ...]}

Rules:
- Only list a reference URL if it appears in the verification context below. Never invent URLs.
- Mark a claim "unverified" rather than guessing when the context does not settle it.
- severity "high" means the claim could materially mislead the reader.

Verification context (from live web searches):
{context}

Content:
{content}"#;

const ACTION_ITEMS_TEMPLATE: &str = r#"Extract concrete, actionable takeaways the viewer/reader could act on (recommendations, steps, resources, warnings). Respond with ONLY a JSON object: {"items": [{"action": "...", "detail": "..."}]}. If the content has no actionable advice, return {"items": []}.

Content:
{content}"#;

const TONE_TEMPLATE: &str = r#"Identify the dominant tone of this content. The samples below are taken from the start, middle and end; if the tone shifts, report the dominant one. Respond with ONLY one word from: serious, satirical, humorous, promotional, educational, inspirational, alarmist, neutral.

Samples:
{content}"#;

const CLAIM_EXTRACTION_TEMPLATE: &str = r#"Extract the 2-5 most significant verifiable factual claims from this content. A verifiable claim names specific facts (numbers, events, people, studies) that a web search could confirm or refute. Skip opinions and predictions. Respond with ONLY a JSON array of claim strings.

Content:
{content}"#;

fn prompt(
    section: &str,
    system: &str,
    template: &str,
    temperature: f32,
    max_tokens: u32,
    expect_json: bool,
    use_web_search: bool,
) -> AnalysisPrompt {
    AnalysisPrompt {
        id: 0,
        section: section.to_string(),
        version: 1,
        system_text: system.to_string(),
        user_template: template.to_string(),
        model: String::new(), // empty means the provider default
        temperature,
        max_tokens,
        expect_json,
        use_web_search,
        updated_at: Utc::now(),
    }
}

/// All built-in prompts: the seven sections plus the auxiliary tone and
/// claim-extraction prompts.
pub fn default_prompts() -> Vec<AnalysisPrompt> {
    vec![
        prompt("overview", SHARED_PREAMBLE, OVERVIEW_TEMPLATE, 0.4, 400, false, false),
        prompt("triage", SHARED_PREAMBLE, TRIAGE_TEMPLATE, 0.1, 200, true, false),
        prompt("mid_summary", SHARED_PREAMBLE, MID_SUMMARY_TEMPLATE, 0.4, 800, false, false),
        prompt("detailed_summary", SHARED_PREAMBLE, DETAILED_SUMMARY_TEMPLATE, 0.4, 2000, false, false),
        prompt("auto_tags", SHARED_PREAMBLE, AUTO_TAGS_TEMPLATE, 0.2, 150, true, false),
        prompt("truth_check", SHARED_PREAMBLE, TRUTH_CHECK_TEMPLATE, 0.1, 1500, true, true),
        prompt("action_items", SHARED_PREAMBLE, ACTION_ITEMS_TEMPLATE, 0.3, 800, true, false),
        prompt(SECTION_TONE, "You classify tone precisely and answer with one word.", TONE_TEMPLATE, 0.0, 10, false, false),
        prompt(
            SECTION_CLAIM_EXTRACTION,
            "You extract checkable factual claims.",
            CLAIM_EXTRACTION_TEMPLATE,
            0.1,
            400,
            true,
            false,
        ),
    ]
}
