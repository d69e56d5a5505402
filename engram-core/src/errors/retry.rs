//! Retry combinator for transient failures.

use std::future::Future;
use std::time::Duration;

use crate::constants;

use super::{EngramError, EngramResult};

/// Exponential backoff policy with a delay cap.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: constants::DEFAULT_RETRY_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(constants::DEFAULT_RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(constants::DEFAULT_RETRY_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the given 1-based attempt: `base × 2^(attempt−1)`,
    /// capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor as u32).min(self.max_delay)
    }
}

/// Run `op`, retrying on transient errors with exponential backoff.
///
/// Non-transient errors propagate immediately. When attempts run out, the
/// last transient error is wrapped in `RETRY_EXHAUSTED` so callers can
/// distinguish exhaustion from a first-try failure.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> EngramResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngramResult<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                tracing_backoff(attempt, &err);
                tokio::time::sleep(policy.delay_for(attempt)).await;
            }
            Err(err) if err.is_transient() => {
                return Err(EngramError::RetryExhausted {
                    attempts: attempt,
                    last_error: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }
}

fn tracing_backoff(attempt: u32, err: &EngramError) {
    tracing::debug!(attempt, code = err.code(), "transient failure, backing off");
}
