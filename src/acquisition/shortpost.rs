//! Short-post acquisition with a mirror-host fallback chain.
//!
//! Social hosts aggressively block scrapers, so known hosts try a
//! prioritized list of mirrors first and fall back to the canonical URL.
//! The chain stops at the first response with enough extracted text.

use tracing::debug;
use url::Url;

use super::{classify_failure, AcquireOutcome, Acquirer};
use crate::models::{ContentItem, FailureCategory};
use crate::providers::with_retry;
use crate::utils::Deadline;

/// Minimum extracted text for a mirror response to count.
const MIN_POST_LEN: usize = 280;

/// Mirror hosts tried, in priority order, for known social hosts.
fn mirrors_for(host: &str) -> &'static [&'static str] {
    match host {
        "twitter.com" | "x.com" | "mobile.twitter.com" => {
            &["nitter.net", "nitter.poast.org", "xcancel.com"]
        }
        "threads.net" => &["threadsviewer.com"],
        _ => &[],
    }
}

fn with_host(url: &str, new_host: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    parsed.set_host(Some(new_host)).ok()?;
    Some(parsed.to_string())
}

pub(super) async fn acquire(
    acq: &Acquirer,
    item: &mut ContentItem,
    deadline: Deadline,
) -> AcquireOutcome {
    let host = crate::utils::domain_of(&item.url).unwrap_or_default();

    // Mirrors get a single attempt each; the canonical URL gets the full
    // retry budget afterwards.
    for mirror in mirrors_for(&host) {
        if deadline.expired() {
            break;
        }
        let Some(mirror_url) = with_host(&item.url, mirror) else {
            continue;
        };
        debug!("trying mirror {mirror_url}");
        match acq.scraper.scrape(&mirror_url, deadline.cap(acq.call_timeout)).await {
            Ok(page) if page.text.len() >= MIN_POST_LEN => {
                if item.title.is_none() {
                    item.title = page.title;
                }
                item.full_text = Some(page.text);
                return AcquireOutcome::Acquired { paywall_warning: false };
            }
            Ok(_) => debug!("mirror {mirror} returned too little text"),
            Err(e) => debug!("mirror {mirror} failed: {e}"),
        }
    }

    let scraped = with_retry("short post scrape", acq.retry, deadline, || {
        acq.scraper.scrape(&item.url, deadline.cap(acq.call_timeout))
    })
    .await;

    match scraped {
        Ok(page) if page.text.len() >= MIN_POST_LEN => {
            if item.title.is_none() {
                item.title = page.title;
            }
            item.full_text = Some(page.text);
            AcquireOutcome::Acquired { paywall_warning: false }
        }
        Ok(_) => AcquireOutcome::Failed(FailureCategory::TooShort),
        Err(e) => AcquireOutcome::Failed(classify_failure(&e)),
    }
}
