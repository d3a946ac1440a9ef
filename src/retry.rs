//! Exponential backoff for fallible async operations
//!
//! Every DOM interaction the walker performs (navigation, waiting for an
//! element, selecting an option) goes through [`retry_with_backoff`]. The
//! policy is deliberately simple: a fixed retry budget, a growing delay, no
//! jitter and no delay cap.

use crate::config::CrawlerConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry budget and delay progression for one retried operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Factor applied to the delay after each failed retry
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_backoff_ms),
            backoff_multiplier: config.backoff_multiplier,
        }
    }

    /// Returns the delay that follows `delay` in the backoff progression
    pub fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.backoff_multiplier)
            .unwrap_or(Duration::MAX)
    }

    /// Sum of all waits performed when every attempt fails
    pub fn worst_case_wait(&self) -> Duration {
        let mut total = Duration::ZERO;
        let mut delay = self.initial_delay;
        for _ in 0..self.max_retries {
            total = total.saturating_add(delay);
            delay = self.next_delay(delay);
        }
        total
    }
}

/// Runs `operation`, retrying it with exponential backoff on failure
///
/// After a failed attempt the helper sleeps for the current delay, multiplies
/// the delay by the policy's multiplier and tries again, until the retry budget
/// is spent. The final error is returned to the caller unchanged.
///
/// # Arguments
///
/// * `policy` - Retry budget and delay progression
/// * `label` - Short description of the operation, used in log lines
/// * `operation` - Factory producing a fresh future for every attempt
///
/// # Example
///
/// ```no_run
/// use repair_price_crawler::retry::{retry_with_backoff, RetryPolicy};
///
/// # async fn example() -> Result<(), std::io::Error> {
/// let policy = RetryPolicy::default();
/// let value = retry_with_backoff(&policy, "read answer", || async {
///     Ok::<_, std::io::Error>(42)
/// })
/// .await?;
/// assert_eq!(value, 42);
/// # Ok(())
/// # }
/// ```
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut remaining = policy.max_retries;
    let mut delay = policy.initial_delay;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if remaining == 0 => return Err(e),
            Err(e) => {
                tracing::warn!(
                    "{} failed: {}. Retrying in {:?} ({} retries left)",
                    label,
                    e,
                    delay,
                    remaining
                );
                tokio::time::sleep(delay).await;
                delay = policy.next_delay(delay);
                remaining -= 1;
            }
        }
    }
}
