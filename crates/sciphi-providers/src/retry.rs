//! Retry with exponential backoff around any fallible async call.
//!
//! [`retry_with_backoff`] is independent of the providers: it takes the
//! operation and a classifier that says whether an error is worth repeating.
//! Permanent errors return immediately; transient ones are retried until the
//! attempt budget is spent.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use sciphi_core::config::RetryConfig;

use crate::error::Classification;

/// Attempt budget and backoff shape.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first. `0` behaves like `1`.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Pick each delay uniformly from `[delay / 2, delay]`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Effective attempt budget.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Un-jittered backoff after the `retry`-th failure (0-based):
    /// `min(base * 2^retry, max)`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Actual wait before the next attempt, honouring a provider hint.
    fn delay_for(&self, retry: u32, hint: Option<Duration>) -> Duration {
        let mut delay = self.backoff(retry);
        if self.jitter {
            let nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
            delay = Duration::from_nanos(rand::rng().random_range(nanos / 2..=nanos));
        }
        match hint {
            Some(hint) => delay.max(hint).min(self.max_delay),
            None => delay,
        }
    }
}

/// A successful value and how many attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

/// The last error and how many attempts were made before giving up.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryFailure<E> {
    pub error: E,
    pub attempts: u32,
}

/// Run `op` until it succeeds, fails permanently, or the budget is spent.
///
/// `op` receives the 1-based attempt number. `classify` decides whether an
/// error is transient; a transient error's `retry_after` hint raises the wait
/// to at least the hint (still capped at `max_delay`).
pub async fn retry_with_backoff<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    classify: C,
    mut op: F,
) -> Result<Retried<T>, RetryFailure<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> Classification,
    E: Display,
{
    let max_attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match op(attempt).await {
            Ok(value) => {
                return Ok(Retried {
                    value,
                    attempts: attempt,
                })
            }
            Err(error) => error,
        };

        let hint = match classify(&error) {
            Classification::Permanent => {
                debug!(attempt, error = %error, "Permanent failure, not retrying");
                return Err(RetryFailure {
                    error,
                    attempts: attempt,
                });
            }
            Classification::Transient { retry_after } => retry_after,
        };

        if attempt >= max_attempts {
            warn!(attempts = attempt, error = %error, "Retry budget exhausted");
            return Err(RetryFailure {
                error,
                attempts: attempt,
            });
        }

        let delay = policy.delay_for(attempt - 1, hint);
        warn!(
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Transient failure, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
