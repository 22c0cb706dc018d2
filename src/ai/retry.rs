//! Retry Policy
//!
//! One retry component shared by every provider: bounded attempts, linear
//! backoff (`attempt * base_delay`) and a retryable-error predicate.
//! Built on `backon` with a custom backoff builder and the tokio sleeper.

use std::future::Future;
use std::time::Duration;

use backon::{BackoffBuilder, Retryable};
use tracing::warn;

use crate::constants::retry as retry_constants;
use crate::types::{RepoDocsError, Result};

/// Predicate deciding whether an error is worth another attempt
pub type RetryPredicate = fn(&RepoDocsError) -> bool;

/// Retry configuration for one call site
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first one (minimum 1)
    pub max_attempts: usize,
    /// Linear backoff unit
    pub base_delay: Duration,
    pub retryable: RetryPredicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: retry_constants::MAX_ATTEMPTS,
            base_delay: Duration::from_millis(retry_constants::BASE_DELAY_MS),
            retryable: RepoDocsError::is_retryable,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Default::default()
        }
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn with_predicate(mut self, retryable: RetryPredicate) -> Self {
        self.retryable = retryable;
        self
    }

    /// Delays between attempts: `base, 2*base, ...`
    pub fn backoff(&self) -> LinearBuilder {
        LinearBuilder {
            base_delay: self.base_delay,
            max_retries: self.max_attempts.saturating_sub(1),
        }
    }

    /// Run `operation` until it succeeds, fails permanently or runs out of attempts
    ///
    /// The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, label: &str, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let retryable = self.retryable;
        operation
            .retry(self.backoff())
            .when(move |err: &RepoDocsError| retryable(err))
            .notify(|err: &RepoDocsError, delay: Duration| {
                warn!(
                    call = label,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Attempt failed, retrying"
                );
            })
            .await
    }
}

/// Builder for [`LinearBackoff`]
#[derive(Debug, Clone, Copy)]
pub struct LinearBuilder {
    base_delay: Duration,
    max_retries: usize,
}

impl BackoffBuilder for LinearBuilder {
    type Backoff = LinearBackoff;

    fn build(self) -> Self::Backoff {
        LinearBackoff {
            base_delay: self.base_delay,
            max_retries: self.max_retries,
            attempt: 0,
        }
    }
}

/// Linearly increasing delays, `attempt * base_delay`
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    base_delay: Duration,
    max_retries: usize,
    attempt: usize,
}

impl Iterator for LinearBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_retries {
            return None;
        }
        self.attempt += 1;
        Some(self.base_delay.saturating_mul(self.attempt as u32))
    }
}
