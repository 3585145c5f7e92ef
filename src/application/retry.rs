//! Bounded exponential backoff for transient failures.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Always at least 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(4_000),
            max_backoff: Duration::from_millis(10_000),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (one-based), clamped to `max_backoff`.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let millis = self.initial_backoff.as_millis() as f64 * self.multiplier.powi(exponent);
        if !millis.is_finite() {
            return self.max_backoff;
        }
        Duration::from_millis(millis as u64).min(self.max_backoff)
    }
}

/// Outcome of a retried operation: the final result plus the number of attempts made.
#[derive(Debug)]
pub struct Retried<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Run `operation` until it succeeds, fails with a non-transient error, or the policy's
/// attempts are exhausted.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    label: &str,
    is_transient: P,
    mut operation: F,
) -> Retried<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                return Retried {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(err) if attempt < max_attempts && is_transient(&err) => {
                let delay = policy.backoff_after(attempt);
                metrics::counter!("specdoc_retries_total", "operation" => label.to_string())
                    .increment(1);
                warn!(
                    target = "specdoc::application::retry",
                    operation = label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                return Retried {
                    result: Err(err),
                    attempts: attempt,
                };
            }
        }
    }
}
