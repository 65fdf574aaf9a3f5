//! Shared retry policy for outbound HTTP calls.
//!
//! One policy covers attempt limits, the backoff schedule, server-requested
//! delays (`Retry-After`) and which statuses are worth retrying.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay after failed attempt `n` (0-based); the last entry repeats
    pub backoff: Vec<Duration>,
    /// Length of one `Retry-After` unit
    pub retry_after_unit: Duration,
    /// Units to wait on 429 when the server sends no `Retry-After`
    pub default_retry_after: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
            ],
            retry_after_unit: Duration::from_secs(1),
            default_retry_after: 60,
        }
    }
}

/// Outcome of a single failed attempt.
#[derive(Debug)]
pub enum AttemptError<E> {
    /// Transient; retry after the backoff schedule or the given delay.
    Retry { error: E, delay: Option<Duration> },
    /// Permanent; give up immediately.
    Fatal(E),
}

impl<E> AttemptError<E> {
    pub fn retry(error: E) -> Self {
        AttemptError::Retry { error, delay: None }
    }
}

/// Final error after the policy gave up.
#[derive(Debug)]
pub struct RetryFailure<E> {
    pub error: E,
    pub attempts: u32,
}

impl RetryPolicy {
    /// True for statuses that indicate a transient server-side condition.
    pub fn is_retryable_status(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    /// Backoff delay after the given 0-based attempt.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff
            .get(attempt as usize)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or_default()
    }

    /// Delay requested by a `Retry-After` header value (in seconds-as-units).
    pub fn retry_after_delay(&self, header: Option<&str>) -> Duration {
        let units = header
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(self.default_retry_after);
        self.retry_after_unit.saturating_mul(units.min(u32::MAX as u64) as u32)
    }

    /// Run `operation` until it succeeds, fails permanently or runs out of attempts.
    ///
    /// Returns the value with the number of attempts used.
    pub async fn run<T, E, F, Fut>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<(T, u32), RetryFailure<E>>
    where
        E: std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptError<E>>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation(attempt).await {
                Ok(value) => return Ok((value, attempt)),
                Err(AttemptError::Fatal(error)) => {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        error = %error,
                        "Permanent failure, not retrying"
                    );
                    return Err(RetryFailure {
                        error,
                        attempts: attempt,
                    });
                }
                Err(AttemptError::Retry { error, delay }) => {
                    if attempt >= max_attempts {
                        tracing::error!(
                            operation = operation_name,
                            attempt,
                            error = %error,
                            "Giving up after max attempts"
                        );
                        return Err(RetryFailure {
                            error,
                            attempts: attempt,
                        });
                    }

                    let delay = delay.unwrap_or_else(|| self.backoff_for(attempt - 1));
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient failure, will retry"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
