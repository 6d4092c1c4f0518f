//! Exponential backoff for transient "overloaded" upstream failures.
//!
//! Orthogonal to the orchestrator's timeout/cancellation: this wraps a
//! single adapter call, and the whole retrying operation still races the
//! in-flight handle.

use std::future::Future;
use std::time::Duration;

use crate::error::GenerationError;

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after `attempt` failures:
    /// `min(base * 2^(attempt-1), cap)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exp).min(self.max_delay)
    }
}

/// Invoke `op`, retrying with exponential backoff while it reports an
/// upstream "overloaded" condition. Any other error propagates immediately.
/// Exhausting `max_attempts` yields the distinct
/// [`GenerationError::StillOverloaded`] error.
pub async fn with_backoff<T, F, Fut>(
    mut op: F,
    policy: &RetryPolicy,
) -> Result<T, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_overloaded() => {
                if attempt >= policy.max_attempts {
                    tracing::warn!(
                        attempts = policy.max_attempts,
                        "provider still overloaded, giving up"
                    );
                    return Err(GenerationError::StillOverloaded {
                        attempts: policy.max_attempts,
                    });
                }
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "provider overloaded, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
