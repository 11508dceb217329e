//! Video acquisition: metadata and transcript fetched independently.

use tracing::warn;

use super::{classify_failure, AcquireOutcome, Acquirer};
use crate::models::{ContentItem, FailureCategory};
use crate::providers::{with_retry, TranscriptSegment};
use crate::utils::{format_timestamp, Deadline};

/// Transcript window size in seconds. Windows keep timestamps citable in
/// later sections without one line per caption.
const WINDOW_SECS: u64 = 30;

pub(super) async fn acquire(
    acq: &Acquirer,
    item: &mut ContentItem,
    deadline: Deadline,
) -> AcquireOutcome {
    // Metadata and transcript are independent calls with independent
    // retry budgets; only the transcript is load-bearing.
    let (metadata, transcript) = tokio::join!(
        with_retry("video metadata", acq.retry, deadline, || {
            acq.video_metadata.metadata(&item.url, deadline.cap(acq.call_timeout))
        }),
        with_retry("video transcript", acq.retry, deadline, || {
            acq.transcripts.transcript(&item.url, deadline.cap(acq.call_timeout))
        }),
    );

    match metadata {
        Ok(meta) => {
            item.title = meta.title.or(item.title.take());
            item.author = meta.author;
            item.duration_secs = meta.duration_secs;
            item.view_count = meta.view_count;
        }
        Err(e) => warn!("video metadata unavailable for {}: {e}", item.url),
    }

    match transcript {
        Ok(segments) if !segments.is_empty() => {
            item.full_text = Some(render_transcript(&segments));
            AcquireOutcome::Acquired { paywall_warning: false }
        }
        Ok(_) => AcquireOutcome::Failed(FailureCategory::NoTranscript),
        Err(e) => AcquireOutcome::Failed(classify_failure(&e)),
    }
}

/// Render transcript segments as 30-second `[MM:SS]` blocks.
pub fn render_transcript(segments: &[TranscriptSegment]) -> String {
    let mut blocks: Vec<(u64, String)> = Vec::new();
    for segment in segments {
        let text = segment.text.trim();
        if text.is_empty() {
            continue;
        }
        let window = (segment.start_secs.max(0.0) as u64 / WINDOW_SECS) * WINDOW_SECS;
        match blocks.last_mut() {
            Some((current, body)) if *current == window => {
                body.push(' ');
                body.push_str(text);
            }
            _ => blocks.push((window, text.to_string())),
        }
    }
    blocks
        .into_iter()
        .map(|(window, body)| format!("[{}] {}", format_timestamp(window), body))
        .collect::<Vec<_>>()
        .join("\n")
}
