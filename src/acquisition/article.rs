//! Article and document acquisition via page scraping.

use super::{classify_failure, AcquireOutcome, Acquirer};
use crate::models::{ContentItem, FailureCategory};
use crate::providers::with_retry;
use crate::utils::Deadline;

/// Minimum extracted text length to count as usable.
const MIN_TEXT_LEN: usize = 200;

/// Below this length a mid-sentence ending suggests a paywall cut.
const PAYWALL_SUSPECT_LEN: usize = 1_500;

const PAYWALL_MARKERS: &[&str] = &[
    "subscribe to continue",
    "subscribe to read",
    "to continue reading",
    "sign in to read",
    "this article is for subscribers",
    "create a free account to continue",
];

pub(super) async fn acquire(
    acq: &Acquirer,
    item: &mut ContentItem,
    deadline: Deadline,
) -> AcquireOutcome {
    let scraped = with_retry("article scrape", acq.retry, deadline, || {
        acq.scraper.scrape(&item.url, deadline.cap(acq.call_timeout))
    })
    .await;

    match scraped {
        Ok(page) => {
            if page.text.len() < MIN_TEXT_LEN {
                return AcquireOutcome::Failed(FailureCategory::TooShort);
            }
            let paywall_warning = looks_paywalled(&page.text);
            if item.title.is_none() {
                item.title = page.title;
            }
            item.full_text = Some(page.text);
            AcquireOutcome::Acquired { paywall_warning }
        }
        Err(e) => AcquireOutcome::Failed(classify_failure(&e)),
    }
}

/// Heuristic paywall-truncation detection. A warning, never a failure.
pub(crate) fn looks_paywalled(text: &str) -> bool {
    let lowered = text.to_lowercase();
    if PAYWALL_MARKERS.iter().any(|m| lowered.contains(m)) {
        return true;
    }
    if text.len() < PAYWALL_SUSPECT_LEN {
        // Short text ending mid-sentence suggests a cut, not an ending
        let tail = text.trim_end();
        if let Some(last) = tail.chars().last() {
            return !matches!(last, '.' | '!' | '?' | '"' | '\u{201d}' | ')');
        }
    }
    false
}
