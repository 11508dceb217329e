//! Article and short-post scrape client.
//!
//! Fetches a page and extracts readable text, preferring article-like
//! containers over the raw body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ProviderError, ScrapeProvider, ScrapedPage};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0 Safari/537.36";

/// Configuration for the scrape client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Custom user agent; a browser-like default is used when unset.
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// HTTP client for page scraping.
pub struct ScrapeClient {
    client: Client,
}

impl ScrapeClient {
    pub fn new(config: ScrapeConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_deref().unwrap_or(USER_AGENT))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| ProviderError::Connection(e.to_string()))?;
        Ok(Self { client })
    }
}

/// Extract readable text from an HTML document.
///
/// Tries content containers in priority order; falls back to all
/// paragraphs, then the whole body.
pub fn extract_text(html: &str) -> ScrapedPage {
    let doc = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    for container in ["article", "main", "[role=\"main\"]"] {
        if let Ok(sel) = Selector::parse(container) {
            if let Some(el) = doc.select(&sel).next() {
                let text = collect_text(el);
                if text.len() > 200 {
                    return ScrapedPage { title, text };
                }
            }
        }
    }

    if let Ok(sel) = Selector::parse("p") {
        let paragraphs: Vec<String> = doc
            .select(&sel)
            .map(collect_text)
            .filter(|t| !t.is_empty())
            .collect();
        let text = paragraphs.join("\n\n");
        if !text.is_empty() {
            return ScrapedPage { title, text };
        }
    }

    let body_text = Selector::parse("body")
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .map(collect_text)
        .unwrap_or_default();
    ScrapedPage { title, text: body_text }
}

fn collect_text(el: scraper::ElementRef) -> String {
    let mut out = String::new();
    for piece in el.text() {
        let trimmed = piece.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(trimmed);
    }
    out
}

#[async_trait]
impl ScrapeProvider for ScrapeClient {
    async fn scrape(&self, url: &str, budget: Duration) -> Result<ScrapedPage, ProviderError> {
        debug!("scraping {url}");
        let resp = self
            .client
            .get(url)
            .timeout(budget)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, budget))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
                message: format!("scrape of {url} failed"),
            });
        }

        let html = resp
            .text()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;
        Ok(extract_text(&html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_prefers_article() {
        let html = format!(
            "<html><head><title>A Title</title></head><body>\
             <nav>menu items</nav>\
             <article>{}</article>\
             </body></html>",
            "real content ".repeat(30)
        );
        let page = extract_text(&html);
        assert_eq!(page.title.as_deref(), Some("A Title"));
        assert!(page.text.contains("real content"));
        assert!(!page.text.contains("menu items"));
    }

    #[test]
    fn test_extract_falls_back_to_paragraphs() {
        let html = "<html><body><div><p>first part</p><p>second part</p></div></body></html>";
        let page = extract_text(html);
        assert_eq!(page.text, "first part\n\nsecond part");
    }
}
