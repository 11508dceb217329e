//! Versioned analysis prompt templates.
//!
//! Prompts live in the database so they can be tuned without a deploy.
//! The pipeline reads them through a TTL cache and never mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A prompt template for one section type.
///
/// `user_template` uses `{placeholder}` substitution: `{content}`,
/// `{title}`, `{language}`, `{tone}`, `{metadata}`, `{instructions}`,
/// `{context}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPrompt {
    pub id: i64,
    /// Section key this prompt drives (matches `SectionKind::as_str`, plus
    /// auxiliary keys like "tone_detection" and "claim_extraction").
    pub section: String,
    pub version: i64,
    pub system_text: String,
    pub user_template: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub expect_json: bool,
    pub use_web_search: bool,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisPrompt {
    /// Fill the user template's placeholders.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut out = self.user_template.clone();
        for (key, value) in vars {
            out = out.replace(&format!("{{{key}}}"), value);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let prompt = AnalysisPrompt {
            id: 1,
            section: "overview".to_string(),
            version: 1,
            system_text: String::new(),
            user_template: "Summarize {title} in {language}:\n{content}".to_string(),
            model: "test".to_string(),
            temperature: 0.3,
            max_tokens: 512,
            expect_json: false,
            use_web_search: false,
            updated_at: Utc::now(),
        };
        let rendered = prompt.render(&[
            ("title", "A Post"),
            ("language", "en"),
            ("content", "body"),
        ]);
        assert_eq!(rendered, "Summarize A Post in en:\nbody");
    }
}
