//! Retry operator with a randomized, fixed-window wait between attempts.
//!
//! A [`RetryPolicy`] wraps a fallible async operation. When the operation
//! fails, the policy's predicates decide whether the failure is retryable:
//! - not retryable: the failure is returned immediately
//! - retryable and attempts remain: wait a random duration in
//!   `[wait_min, wait_max)` and run the operation again
//! - retryable but attempts exhausted: the most recent failure is returned
//!
//! The wait window does not grow with the attempt number. Randomizing it keeps
//! concurrent callers sharing one rate limit from retrying in lockstep.
//!
//! # Example
//!
//! ```
//! use airtable_client::retry::RetryPolicy;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RetryPolicy::<std::io::Error>::builder()
//!     .retries(2)
//!     .wait_min_secs(1)
//!     .wait_max_secs(2)
//!     .predicate(|e: &std::io::Error| e.kind() == std::io::ErrorKind::TimedOut)
//!     .build()?;
//!
//! let value = policy.run(|| async { Ok::<_, std::io::Error>(42) }).await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::constants::{
    DEFAULT_MAX_RETRIES, DEFAULT_WAIT_MAX_SECS, DEFAULT_WAIT_MIN_SECS, MAX_WAIT_SECS,
    RATE_LIMIT_STATUS,
};
use crate::error::{ClientError, ErrorKind};

/// Predicate deciding whether a failure may be retried.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Invalid retry wait bounds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryConfigError {
    /// `wait_min` was zero.
    #[error("waitMin must be greater than 0")]
    WaitMinZero,
    /// `wait_max` was zero.
    #[error("waitMax must be greater than 0")]
    WaitMaxZero,
    /// `wait_min` was not below `wait_max`.
    #[error("waitMin ({wait_min}s) must be less than waitMax ({wait_max}s)")]
    WaitRange {
        /// Configured minimum, in seconds.
        wait_min: u64,
        /// Configured maximum, in seconds.
        wait_max: u64,
    },
    /// `wait_max` does not fit the millisecond wait range.
    #[error("waitMax ({wait_max}s) must not exceed {limit}s")]
    WaitMaxTooLarge {
        /// Configured maximum, in seconds.
        wait_max: u64,
        /// Largest accepted maximum, in seconds.
        limit: u64,
    },
}

/// Decision on whether to retry a failed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Run the operation again after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Return the failure to the caller.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Retry operator parameterized by wait bounds, attempt limit and predicates.
///
/// With no predicates registered every failure is retryable. With one or
/// more, a failure is retryable when any of them matches.
pub struct RetryPolicy<E> {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,
    wait_min: Duration,
    wait_max: Duration,
    predicates: Vec<RetryPredicate<E>>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            wait_min: self.wait_min,
            wait_max: self.wait_max,
            predicates: self.predicates.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("wait_min", &self.wait_min)
            .field("wait_max", &self.wait_max)
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

impl<E> RetryPolicy<E> {
    /// Returns a builder with the default window (30-36s) and 5 retries.
    #[must_use]
    pub fn builder() -> RetryPolicyBuilder<E> {
        RetryPolicyBuilder::default()
    }

    /// Returns the maximum number of attempts, including the initial one.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the lower (inclusive) bound of the wait window.
    #[must_use]
    pub fn wait_min(&self) -> Duration {
        self.wait_min
    }

    /// Returns the upper (exclusive) bound of the wait window.
    #[must_use]
    pub fn wait_max(&self) -> Duration {
        self.wait_max
    }

    /// Returns whether `error` matches this policy's predicates.
    #[must_use]
    pub fn is_retryable(&self, error: &E) -> bool {
        self.predicates.is_empty() || self.predicates.iter().any(|predicate| predicate(error))
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed with `error`.
    pub fn decide(&self, error: &E, attempt: u32) -> RetryDecision {
        if !self.is_retryable(error) {
            return RetryDecision::DoNotRetry {
                reason: "failure does not match retry predicates".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        RetryDecision::Retry {
            delay: self.random_wait(),
            attempt: attempt + 1,
        }
    }

    /// Runs `operation`, retrying failures according to this policy.
    ///
    /// `operation` is invoked once per attempt, so it must rebuild whatever
    /// per-attempt state it needs.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable failure, or the failure from the last
    /// attempt once the attempt limit is reached.
    #[instrument(level = "debug", skip_all, fields(max_attempts = self.max_attempts))]
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut attempt = 1;
        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            match self.decide(&error, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    info!(
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "retryable operation failed"
                    );
                    drop(error);
                    tokio::time::sleep(delay).await;
                    attempt = next_attempt;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(attempt, reason = %reason, "not retrying after error");
                    return Err(error);
                }
            }
        }
    }

    /// Draws a wait uniformly from `[wait_min, wait_max)` at millisecond granularity.
    fn random_wait(&self) -> Duration {
        let min_ms = u64::try_from(self.wait_min.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.wait_max.as_millis()).unwrap_or(u64::MAX);
        if min_ms >= max_ms {
            return self.wait_min;
        }
        let wait_ms = rand::thread_rng().gen_range(min_ms..max_ms);
        Duration::from_millis(wait_ms)
    }
}

impl RetryPolicy<ClientError> {
    /// Policy retrying only HTTP 429 responses, 5 times, waiting 30-36s.
    #[must_use]
    pub fn rate_limited() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES + 1,
            wait_min: Duration::from_secs(DEFAULT_WAIT_MIN_SECS),
            wait_max: Duration::from_secs(DEFAULT_WAIT_MAX_SECS),
            predicates: vec![Arc::new(is_rate_limited)],
        }
    }
}

/// Returns whether `error` is a server error with status 429.
#[must_use]
pub fn is_rate_limited(error: &ClientError) -> bool {
    error.status() == Some(RATE_LIMIT_STATUS)
}

/// Builder for [`RetryPolicy`]. Bounds are validated by [`build`](Self::build).
pub struct RetryPolicyBuilder<E> {
    retries: u32,
    wait_min_secs: u64,
    wait_max_secs: u64,
    predicates: Vec<RetryPredicate<E>>,
}

impl<E> Default for RetryPolicyBuilder<E> {
    fn default() -> Self {
        Self {
            retries: DEFAULT_MAX_RETRIES,
            wait_min_secs: DEFAULT_WAIT_MIN_SECS,
            wait_max_secs: DEFAULT_WAIT_MAX_SECS,
            predicates: Vec::new(),
        }
    }
}

impl<E> RetryPolicyBuilder<E> {
    /// Sets the number of retries after the initial attempt (0 means one attempt).
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the minimum wait in seconds (inclusive).
    #[must_use]
    pub fn wait_min_secs(mut self, wait_min_secs: u64) -> Self {
        self.wait_min_secs = wait_min_secs;
        self
    }

    /// Sets the maximum wait in seconds (exclusive).
    #[must_use]
    pub fn wait_max_secs(mut self, wait_max_secs: u64) -> Self {
        self.wait_max_secs = wait_max_secs;
        self
    }

    /// Adds a retry predicate. Without any, every failure is retried.
    #[must_use]
    pub fn predicate(mut self, predicate: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.predicates.push(Arc::new(predicate));
        self
    }

    /// Builds the policy.
    ///
    /// # Errors
    ///
    /// Returns [`RetryConfigError`] when either bound is zero,
    /// `wait_min >= wait_max`, or `wait_max` exceeds [`MAX_WAIT_SECS`].
    pub fn build(self) -> Result<RetryPolicy<E>, RetryConfigError> {
        validate_wait_bounds(self.wait_min_secs, self.wait_max_secs)?;
        Ok(RetryPolicy {
            max_attempts: self.retries.saturating_add(1),
            wait_min: Duration::from_secs(self.wait_min_secs),
            wait_max: Duration::from_secs(self.wait_max_secs),
            predicates: self.predicates,
        })
    }
}

impl RetryPolicyBuilder<ClientError> {
    /// Retries any error of the given category.
    #[must_use]
    pub fn category(self, kind: ErrorKind) -> Self {
        self.predicate(move |error: &ClientError| error.kind() == kind)
    }

    /// Retries HTTP 429 responses only.
    #[must_use]
    pub fn rate_limited(self) -> Self {
        self.predicate(is_rate_limited)
    }
}

/// Checks retry wait bounds without building a policy.
///
/// # Errors
///
/// Returns [`RetryConfigError`] for zero bounds, an empty window, or a
/// maximum above [`MAX_WAIT_SECS`].
pub fn validate_wait_bounds(wait_min_secs: u64, wait_max_secs: u64) -> Result<(), RetryConfigError> {
    if wait_min_secs == 0 {
        return Err(RetryConfigError::WaitMinZero);
    }
    if wait_max_secs == 0 {
        return Err(RetryConfigError::WaitMaxZero);
    }
    if wait_max_secs > MAX_WAIT_SECS {
        return Err(RetryConfigError::WaitMaxTooLarge {
            wait_max: wait_max_secs,
            limit: MAX_WAIT_SECS,
        });
    }
    if wait_min_secs >= wait_max_secs {
        return Err(RetryConfigError::WaitRange {
            wait_min: wait_min_secs,
            wait_max: wait_max_secs,
        });
    }
    Ok(())
}
