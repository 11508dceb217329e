//! Podcast acquisition: submit a transcription job and return.
//!
//! The pipeline never blocks on transcription. The provider's webhook
//! re-enters the pipeline when the transcript is ready.

use tracing::info;

use super::{classify_failure, AcquireOutcome, Acquirer};
use crate::models::{ContentItem, FailureCategory};
use crate::providers::with_retry;
use crate::utils::Deadline;

pub(super) async fn acquire(
    acq: &Acquirer,
    item: &mut ContentItem,
    deadline: Deadline,
    callback_url: Option<&str>,
) -> AcquireOutcome {
    let submitted = with_retry("transcription submit", acq.retry, deadline, || {
        acq.transcription
            .submit(&item.url, callback_url, deadline.cap(acq.call_timeout))
    })
    .await;

    match submitted {
        Ok(job_id) => {
            info!("transcription job {job_id} submitted for content {}", item.id);
            AcquireOutcome::Transcribing { job_id }
        }
        Err(e) => {
            let category = match classify_failure(&e) {
                FailureCategory::Blocked => FailureCategory::TranscriptionFailed,
                other => other,
            };
            AcquireOutcome::Failed(category)
        }
    }
}
