//! Retry with exponential backoff and response classification.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::{ErrorClass, ProviderError};
use crate::utils::Deadline;

/// Backoff policy for retryable provider calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Extra multiplier applied to backoff after a 429.
    pub rate_limit_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            rate_limit_multiplier: 4,
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `attempt` (1-based) after error class `class`.
    fn backoff(&self, attempt: u32, class: ErrorClass) -> Duration {
        let exp = self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1));
        if class == ErrorClass::RateLimited {
            exp * self.rate_limit_multiplier
        } else {
            exp
        }
    }
}

/// Run `op` with retries under a deadline.
///
/// Non-retryable failures (4xx except 429, missing credentials) abort
/// immediately. Rate limits back off with the longer multiplier. The
/// deadline bounds the whole loop; when no time remains for another
/// attempt, the last error is returned.
pub async fn with_retry<T, F, Fut>(
    label: &str,
    policy: RetryPolicy,
    deadline: Deadline,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut last_err = None;
    for attempt in 1..=policy.max_attempts {
        if deadline.expired() {
            return Err(last_err.unwrap_or(ProviderError::Timeout(Duration::ZERO)));
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let class = e.class();
                if class == ErrorClass::NonRetryable {
                    debug!("{label}: non-retryable failure: {e}");
                    return Err(e);
                }
                if attempt < policy.max_attempts {
                    let delay = policy.backoff(attempt, class).min(deadline.remaining());
                    warn!("{label}: attempt {attempt}/{} failed ({e}), retrying in {delay:?}", policy.max_attempts);
                    tokio::time::sleep(delay).await;
                } else {
                    warn!("{label}: attempt {attempt}/{} failed ({e}), giving up", policy.max_attempts);
                }
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or(ProviderError::Timeout(Duration::ZERO)))
}
