//! Exponential-backoff retry for fallible remote operations.
//!
//! Only transient failures (connectivity, timeouts, explicit "unavailable"
//! classifications) are retried; everything else is surfaced on the first
//! occurrence. The wrapper holds no shared state and is safe for concurrent
//! independent calls.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Default number of attempts for remote writes.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Attempts used for low-stakes device status reads.
pub const DEVICE_STATUS_MAX_ATTEMPTS: u32 = 2;

/// Base delay for the exponential backoff schedule.
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Classifies errors into transient (retry) and permanent (propagate).
pub trait Retryable {
    /// `true` for connectivity failures, timeouts, and explicit
    /// unavailable/deadline-exceeded classifications.
    fn is_transient(&self) -> bool;
}

/// Stateless retry configuration; lives only for the duration of one call.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: RETRY_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts, base_delay }
    }

    /// Backoff before retrying after the zero-indexed `attempt`: `2^attempt * base`.
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(31))
    }
}

/// Executes `operation` up to `policy.max_attempts` times.
///
/// Transient failures wait `2^attempt * base_delay` and retry while attempts
/// remain; exhausting all attempts propagates the last error. Non-transient
/// errors propagate immediately without a delay.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, E>
where
    E: Retryable,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if error.is_transient() && attempt + 1 < attempts {
                    let wait = policy.backoff(attempt);
                    debug!(attempt, wait_ms = wait.as_millis() as u64, "transient failure, retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                } else {
                    return Err(error);
                }
            }
        }
    }
}
