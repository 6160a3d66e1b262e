//! Bounded retry with linear backoff.
//!
//! Attempt `n` that fails is followed by a sleep of `unit * n` before attempt
//! `n + 1`. No sleep follows the final attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use aifmt_core::RunSettings;

use crate::error::RetryError;

/// How many times an operation may run and how long to back off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    unit: Duration,
}

impl RetryPolicy {
    /// `max_attempts` below 1 is raised to 1: the operation always runs once.
    pub fn new(max_attempts: u32, unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            unit,
        }
    }

    /// Policy for every fallible step of a file task. Skip mode collapses the
    /// budget to a single attempt.
    pub fn for_run(settings: &RunSettings) -> Self {
        if settings.skip_retries {
            Self::new(1, settings.retry_unit)
        } else {
            Self::new(settings.max_retries, settings.retry_unit)
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sleep taken after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.unit.saturating_mul(attempt)
    }
}

/// Run `op` until it succeeds or the policy's attempt budget is spent.
///
/// `op` receives the 1-based attempt number. On exhaustion the last error is
/// returned inside [`RetryError`] together with the number of attempts made.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(last) if attempt >= policy.max_attempts => {
                return Err(RetryError {
                    attempts: attempt,
                    last,
                });
            }
            Err(err) => {
                let delay = policy.delay_after(attempt);
                tracing::debug!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "attempt failed, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
