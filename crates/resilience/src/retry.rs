//! Retry with Backoff
//!
//! This module provides a bounded retry executor with optional exponential
//! backoff and an observer callback invoked on each retry. On final failure
//! the original error is returned unchanged so the root cause survives for
//! logging.
//!
//! The wrapped operation may execute multiple times with partial side
//! effects on each failed attempt; the executor makes no attempt to detect
//! or prevent duplicates, so operations must be idempotent-safe from the
//! caller's perspective.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first (attempt numbering starts at 1)
    pub max_attempts: u32,
    /// Base delay between attempts
    pub delay: Duration,
    /// Double the delay after each failed attempt
    pub exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
            exponential_backoff: true,
        }
    }
}

/// Bounded retry executor
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create an executor with the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Get the policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds or the attempt budget is spent.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.execute_with_observer(operation, |_, _| {}).await
    }

    /// Run `operation` with an observer invoked before each retry.
    ///
    /// The observer receives the number of the attempt that just failed
    /// (starting at 1) and the error. It is not invoked for the final
    /// failure, which is returned to the caller unwrapped.
    pub async fn execute_with_observer<T, E, F, Fut, O>(
        &self,
        mut operation: F,
        mut on_retry: O,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        O: FnMut(u32, &E),
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1u32;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Operation succeeded on attempt {}", attempt);
                    }
                    return Ok(value);
                }
                Err(err) if attempt < max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        "Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, max_attempts, err, delay
                    );
                    on_retry(attempt, &err);
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!(
                        "Operation failed after {} attempts: {}",
                        max_attempts, err
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Delay before the attempt following failed attempt `attempt`:
    /// `delay * 2^(attempt - 1)` with exponential backoff, else flat.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        if self.policy.exponential_backoff {
            let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
            self.policy.delay.saturating_mul(factor)
        } else {
            self.policy.delay
        }
    }
}
