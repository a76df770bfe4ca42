//! Conflict retry policy for optimistic-lock writes.
//!
//! Two modes are supported: the unbounded mode retries a conflicting
//! read-modify-write cycle forever without delay, the bounded mode backs off
//! exponentially with jitter and gives up with
//! [`CrudError::ConflictExhausted`] once the retry budget is spent.
//! Other failures can be retried through a caller predicate, either within
//! the same budget or for as long as the predicate holds.

use crate::config::RetryConfig;
use crate::core::{CrudError, Result};
use log::warn;
use rand::Rng;
use std::time::Duration;

/// How many retries may follow the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryLimit {
    Indefinite,
    AtMost(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    limit: RetryLimit,
    base_backoff: Duration,
    max_backoff: Duration,
    jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        let limit = config
            .max_retries
            .map_or(RetryLimit::Indefinite, RetryLimit::AtMost);
        Self::with_backoff(config.backoff, config.jitter, limit).max_backoff(config.max_backoff)
    }
}

impl RetryPolicy {
    /// Retries forever with no delay between attempts.
    pub fn indefinite() -> Self {
        Self {
            limit: RetryLimit::Indefinite,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter: 0.0,
        }
    }

    /// At most `max_retries` retries with no delay between attempts.
    pub fn bounded(max_retries: u32) -> Self {
        Self {
            limit: RetryLimit::AtMost(max_retries),
            ..Self::indefinite()
        }
    }

    /// Exponential backoff starting at `base`, stretched by `jitter` (clamped to `[0, 1]`).
    ///
    /// The cap defaults to ten times `base`.
    pub fn with_backoff(base: Duration, jitter: f64, limit: RetryLimit) -> Self {
        Self {
            limit,
            base_backoff: base,
            max_backoff: base.saturating_mul(10),
            jitter: if jitter.is_finite() {
                jitter.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }

    pub fn max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff.max(self.base_backoff);
        self
    }

    pub fn limit(&self) -> RetryLimit {
        self.limit
    }

    pub fn base_backoff(&self) -> Duration {
        self.base_backoff
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    fn allows_retry(&self, retries_done: u32) -> bool {
        match self.limit {
            RetryLimit::Indefinite => true,
            RetryLimit::AtMost(max) => retries_done < max,
        }
    }

    /// Delay before retry number `retry` (1-based), before jitter.
    pub fn nominal_backoff(&self, retry: u32) -> Duration {
        if self.base_backoff.is_zero() {
            return Duration::ZERO;
        }

        let mut backoff = self.base_backoff;
        for _ in 1..retry {
            backoff = backoff.saturating_mul(2).min(self.max_backoff);
            if backoff == self.max_backoff {
                break;
            }
        }
        backoff
    }

    /// Delay before retry number `retry` with jitter applied.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let nominal = self.nominal_backoff(retry);
        if nominal.is_zero() || self.jitter == 0.0 {
            return nominal;
        }

        let factor = rand::rng().random_range((1.0 - self.jitter)..=(1.0 + self.jitter));
        nominal.mul_f64(factor)
    }

    /// Runs `attempt` until it succeeds, fails with a non-conflict error, or
    /// the retry budget is spent.
    ///
    /// Each call to `attempt` must perform the whole read-modify-write cycle
    /// so that a retry observes the version the competing writer committed.
    pub async fn retry_on_conflict<T, F, Fut>(&self, operation: &str, attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.drive(operation, true, CrudError::is_conflict, attempt)
            .await
            .map_err(|stop| match stop {
                Stop::Failed(err) => err,
                Stop::Exhausted { attempts, last } => CrudError::ConflictExhausted {
                    operation: operation.to_string(),
                    attempts,
                    last: Box::new(last),
                },
            })
    }

    /// Retries every error accepted by `should_retry` within the retry budget.
    ///
    /// Errors the predicate rejects end the call at once. Exhaustion yields
    /// [`CrudError::RetriesExhausted`] wrapping the last error.
    pub async fn retry_when<T, F, Fut, P>(
        &self,
        operation: &str,
        should_retry: P,
        attempt: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&CrudError) -> bool,
    {
        self.drive(operation, true, should_retry, attempt)
            .await
            .map_err(|stop| match stop {
                Stop::Failed(err) => err,
                Stop::Exhausted { attempts, last } => CrudError::RetriesExhausted {
                    operation: operation.to_string(),
                    attempts,
                    last: Box::new(last),
                },
            })
    }

    /// Retries for as long as `keep_retrying` accepts the latest error.
    ///
    /// The predicate replaces the retry limit; backoff still applies. The
    /// first rejected error is returned unchanged.
    pub async fn retry_until<T, F, Fut, P>(
        &self,
        operation: &str,
        keep_retrying: P,
        attempt: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&CrudError) -> bool,
    {
        self.drive(operation, false, keep_retrying, attempt)
            .await
            .map_err(|stop| match stop {
                Stop::Failed(err) | Stop::Exhausted { last: err, .. } => err,
            })
    }

    async fn drive<T, F, Fut, P>(
        &self,
        operation: &str,
        within_limit: bool,
        should_retry: P,
        mut attempt: F,
    ) -> std::result::Result<T, Stop>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&CrudError) -> bool,
    {
        let mut retries = 0u32;
        loop {
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if should_retry(&err) => err,
                Err(err) => return Err(Stop::Failed(err)),
            };

            if within_limit && !self.allows_retry(retries) {
                return Err(Stop::Exhausted {
                    attempts: retries.saturating_add(1),
                    last: err,
                });
            }
            retries = retries.saturating_add(1);

            let backoff = self.backoff_for(retries);
            warn!(
                "{} retry (retry {} of {}): {} (backoff={}ms)",
                operation,
                retries,
                if within_limit {
                    self.describe_limit()
                } else {
                    "bound".to_string()
                },
                err,
                backoff.as_millis()
            );

            if backoff.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(backoff).await;
            }
        }
    }

    fn describe_limit(&self) -> String {
        match self.limit {
            RetryLimit::Indefinite => "unbounded".to_string(),
            RetryLimit::AtMost(max) => max.to_string(),
        }
    }
}

enum Stop {
    Failed(CrudError),
    Exhausted { attempts: u32, last: CrudError },
}
