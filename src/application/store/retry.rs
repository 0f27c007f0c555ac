//! Bounded retry with linear backoff.
//!
//! Decoupled from persistence so the policy can be tested on its own and
//! reused for any fallible async operation.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_retry::Retry;
use tracing::warn;

/// How many times to try and how long to wait between tries.
///
/// The delay before attempt `n + 1` is `base_delay * n`, so a policy of
/// 3 attempts with a 100ms base waits 100ms, then 200ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delays between consecutive attempts; yields `max_attempts - 1` items.
    pub fn delays(self) -> impl Iterator<Item = Duration> {
        let base = self.base_delay;
        let retries = self.max_attempts.saturating_sub(1) as u32;
        (1..=retries).map(move |n| base * n)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

/// Runs `op` until it succeeds or the policy is exhausted.
///
/// `op` receives the 1-based attempt number. Every failure except the last
/// is logged at `warn`; the last error is returned to the caller, which owns
/// the decision of how loudly to report it.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts;
    let mut attempt = 0;

    Retry::spawn(policy.delays(), || {
        attempt += 1;
        let current = attempt;
        let fut = op(current);

        async move {
            let result = fut.await;
            if let Err(e) = &result
                && current < max_attempts
            {
                warn!(operation, attempt = current, error = %e, "operation failed, retrying");
            }
            result
        }
    })
    .await
}
