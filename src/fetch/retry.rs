//! Retry policy for page fetches

use super::types::PageFetcher;
use crate::error::{Error, Result};
use crate::pagination::PaginationResponse;
use crate::types::{BackoffType, Filters};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// How failed fetches are retried
///
/// Client errors (status `400..500`) fail immediately. Anything else is
/// attempted up to `max_attempts` times in total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Type of backoff
    #[serde(rename = "backoff", default)]
    pub backoff_type: BackoffType,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for any single delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_type: BackoffType::Exponential,
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

impl RetryPolicy {
    /// Policy that makes exactly one attempt
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set total attempts
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set backoff configuration
    #[must_use]
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.backoff_type = backoff_type;
        self.initial_backoff_ms = duration_ms(initial);
        self.max_backoff_ms = duration_ms(max);
        self
    }

    /// Whether a failure on attempt `failures` (0-based) should be retried
    pub fn should_retry(&self, failures: u32, error: &Error) -> bool {
        error.is_retryable() && failures + 1 < self.max_attempts
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let initial = Duration::from_millis(self.initial_backoff_ms);
        let delay = match self.backoff_type {
            BackoffType::Constant => initial,
            BackoffType::Linear => initial.saturating_mul(attempt.saturating_add(1)),
            BackoffType::Exponential => initial.saturating_mul(2u32.saturating_pow(attempt)),
        };

        std::cmp::min(delay, Duration::from_millis(self.max_backoff_ms))
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Fetch one page, retrying per `policy`
pub async fn fetch_with_retry<T, F>(
    fetcher: &F,
    policy: &RetryPolicy,
    page: u32,
    limit: u32,
    filters: Option<&Filters>,
) -> Result<PaginationResponse<T>>
where
    T: Send,
    F: PageFetcher<T> + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut failures = 0;

    loop {
        match fetcher.fetch_page(page, limit, filters).await {
            Ok(response) => return Ok(response),
            Err(e) if policy.should_retry(failures, &e) => {
                let delay = policy.calculate_backoff(failures);
                warn!(
                    "Fetching page {} failed: {}, attempt {}/{}, retrying in {:?}",
                    page,
                    e,
                    failures + 1,
                    max_attempts,
                    delay
                );
                tokio::time::sleep(delay).await;
                failures += 1;
            }
            Err(e) => {
                debug!("Fetching page {} failed after {} attempt(s): {}", page, failures + 1, e);
                return Err(e);
            }
        }
    }
}
