//! Bounded retry with exponential backoff
//!
//! [`RetryPolicy`] repeats the *same* operation. Moving on to a *different*
//! provider is the fallback chain's job; a provider only gets a retry policy
//! when it opts in.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry schedule: up to `max_attempts` invocations, waiting
/// `base_delay * 2^attempt_index` after each failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a retry policy
    ///
    /// `max_attempts` of 0 behaves like 1 (a single attempt, no retries).
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// A policy that makes exactly one attempt
    pub fn single_shot() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Total number of invocations allowed
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Base delay of the backoff schedule
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay inserted after the failed attempt with zero-based `attempt_index`
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt_index).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `operation` until it succeeds or the attempts are used up
    ///
    /// The final error is returned unchanged.
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    debug!(
                        "Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt + 1,
                        self.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if self.max_attempts > 1 {
                        warn!("All {} attempts failed: {}", self.max_attempts, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_shot()
    }
}
