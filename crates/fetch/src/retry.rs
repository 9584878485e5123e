//! Retry policy shared by every request the harvester makes.
//!
//! One policy decides three things for all call sites: how many attempts an
//! operation gets, how long to wait between them (capped exponential backoff
//! with optional jitter), and which failures are worth another attempt.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::duration_ms;
use crate::error::{Error, Result};

/// Retry policy for fetch operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles for each further retry.
    #[serde(with = "duration_ms")]
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    #[serde(with = "duration_ms")]
    pub max_delay: Duration,
    /// Add up to a quarter of the delay as random jitter (still capped).
    pub jitter: bool,
    /// HTTP statuses that are retried.
    pub retry_statuses: Vec<u16>,
    /// Retry pages whose structured data is missing, malformed, or partial.
    pub retry_incomplete: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            jitter: true,
            retry_statuses: vec![403, 429, 500, 502, 503, 504],
            retry_incomplete: true,
        }
    }
}

/// A successful value together with what it cost to get it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
    /// Sum of the backoff delays slept before success.
    pub waited: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            ..Default::default()
        }
    }

    /// A policy that tries once and never waits.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    #[must_use]
    pub fn with_retry_statuses(mut self, statuses: impl Into<Vec<u16>>) -> Self {
        self.retry_statuses = statuses.into();
        self
    }

    #[must_use]
    pub const fn with_retry_incomplete(mut self, retry_incomplete: bool) -> Self {
        self.retry_incomplete = retry_incomplete;
        self
    }

    /// Deterministic delay before retry number `retry` (1-based): `base * 2^(retry-1)`, capped.
    #[must_use]
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 2_u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Delay actually slept before retry `retry`, jitter included when enabled.
    #[must_use]
    pub fn calculate_backoff(&self, retry: u32) -> Duration {
        let capped = self.backoff_delay(retry);
        if !self.jitter {
            return capped;
        }

        let capped_ms = u64::try_from(capped.as_millis()).unwrap_or(u64::MAX);
        let jitter_range = capped_ms.checked_div(4).unwrap_or(0).max(1);
        let jitter = rand::random::<u64>().checked_rem(jitter_range).unwrap_or(0);
        Duration::from_millis(capped_ms.saturating_add(jitter)).min(self.max_delay)
    }

    /// The full deterministic schedule of delays between attempts.
    #[must_use]
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts).map(|retry| self.backoff_delay(retry)).collect()
    }

    /// Whether `error` deserves another attempt under this policy.
    #[must_use]
    pub fn should_retry(&self, error: &Error) -> bool {
        if error.is_transport() {
            return true;
        }
        if error.is_incomplete_payload() {
            return self.retry_incomplete;
        }
        error
            .status_code()
            .is_some_and(|status| self.retry_statuses.contains(&status))
    }

    /// Whether another attempt is allowed after `attempt` attempts have run.
    #[must_use]
    pub const fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts run out.
    ///
    /// `op` receives the 1-based attempt number. `resource` names the resource in
    /// logs and in the final error.
    ///
    /// # Errors
    ///
    /// Returns the operation's own error when it is not retryable, or
    /// [`Error::RetriesExhausted`] wrapping the last error once attempts run out.
    pub async fn run<T, F, Fut>(&self, resource: &str, mut op: F) -> Result<Retried<T>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        let mut waited = Duration::ZERO;

        loop {
            attempt = attempt.saturating_add(1);

            match op(attempt).await {
                Ok(value) => {
                    return Ok(Retried {
                        value,
                        attempts: attempt,
                        waited,
                    });
                }
                Err(e) if !self.should_retry(&e) => return Err(e),
                Err(e) if !self.has_attempts_left(attempt) => {
                    warn!(resource, attempts = attempt, error = %e, "Retries exhausted");
                    return Err(Error::RetriesExhausted {
                        target: resource.to_string(),
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.calculate_backoff(attempt);
                    if e.is_rate_limited() {
                        warn!(
                            resource,
                            attempt,
                            delay_ms = delay.as_millis(),
                            "Rate limited, backing off"
                        );
                    } else {
                        debug!(
                            resource,
                            attempt,
                            delay_ms = delay.as_millis(),
                            error = %e,
                            "Retrying after error"
                        );
                    }
                    tokio::time::sleep(delay).await;
                    waited = waited.saturating_add(delay);
                }
            }
        }
    }
}
