//! Retry governor with bounded attempts and randomized backoff
//!
//! The executor runs an operation up to [`RetryConfig::max_invocations`]
//! times. After each failure it asks a [`RetryPolicy`] whether the error is
//! worth another attempt and, if so, sleeps for a duration drawn uniformly
//! from the configured [`BackoffRange`]. When attempts run out or the policy
//! says stop, the last error is returned unchanged.
//!
//! Both execution models are covered: [`RetryExecutor::execute`] suspends on
//! the tokio timer and [`RetryExecutor::execute_blocking`] parks the thread.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors raised while configuring retries
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryError {
    /// The retry configuration is invalid
    #[error("Invalid retry configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after a backoff pause
    Retry,
    /// Surface the error
    Stop,
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// `attempt` is zero-based: `0` is the failure of the first invocation.
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Inclusive range the pause between attempts is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffRange {
    min: Duration,
    max: Duration,
}

impl BackoffRange {
    pub fn new(min: Duration, max: Duration) -> Result<Self, RetryError> {
        if min > max {
            return Err(RetryError::InvalidConfiguration {
                message: format!("backoff minimum {min:?} exceeds maximum {max:?}"),
            });
        }
        Ok(Self { min, max })
    }

    /// A range that always yields `delay`.
    pub fn fixed(delay: Duration) -> Self {
        Self { min: delay, max: delay }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw one pause uniformly from the range.
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let (low, high) = (millis(self.min), millis(self.max));
        Duration::from_millis(rand::thread_rng().gen_range(low..=high))
    }
}

impl Default for BackoffRange {
    fn default() -> Self {
        Self { min: Duration::from_millis(100), max: Duration::from_millis(1000) }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Attempt budget and backoff of a retry governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total invocations allowed; `0` disables retries like `1` does.
    pub attempts: u32,
    /// Pause drawn between two invocations.
    pub backoff: BackoffRange,
}

impl RetryConfig {
    /// Budget of `attempts` invocations separated by `backoff`.
    pub fn new(attempts: u32, backoff: BackoffRange) -> Self {
        Self { attempts, backoff }
    }

    /// A single invocation, no retries.
    pub fn disabled() -> Self {
        Self { attempts: 0, backoff: BackoffRange::default() }
    }

    /// Invocations actually made before giving up.
    pub fn max_invocations(&self) -> u32 {
        self.attempts.max(1)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { attempts: 3, backoff: BackoffRange::default() }
    }
}

/// The main retry executor
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Executor bounded by `config`.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Pause before the next attempt, or `None` when `error` must surface.
    fn delay_after<P, E>(&self, policy: &P, error: &E, attempt: u32) -> Option<Duration>
    where
        P: RetryPolicy<E> + ?Sized,
    {
        if attempt + 1 >= self.config.max_invocations() {
            return None;
        }
        match policy.should_retry(error, attempt) {
            RetryDecision::Retry => Some(self.config.backoff.sample()),
            RetryDecision::Stop => None,
        }
    }

    /// Execute an operation with retry logic
    #[instrument(skip_all, fields(max_attempts = self.config.max_invocations()))]
    pub async fn execute<P, F, Fut, T, E>(&self, policy: &P, mut operation: F) -> Result<T, E>
    where
        P: RetryPolicy<E> + ?Sized,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempts = attempt + 1, "operation succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    let Some(delay) = self.delay_after(policy, &error, attempt) else {
                        self.report_give_up(&error, attempt);
                        return Err(error);
                    };
                    warn!(attempt = attempt + 1, ?delay, %error, "operation failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Blocking twin of [`RetryExecutor::execute`].
    #[instrument(skip_all, fields(max_attempts = self.config.max_invocations()))]
    pub fn execute_blocking<P, F, T, E>(&self, policy: &P, mut operation: F) -> Result<T, E>
    where
        P: RetryPolicy<E> + ?Sized,
        E: fmt::Display,
        F: FnMut() -> Result<T, E>,
    {
        let mut attempt = 0;
        loop {
            match operation() {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempts = attempt + 1, "operation succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    let Some(delay) = self.delay_after(policy, &error, attempt) else {
                        self.report_give_up(&error, attempt);
                        return Err(error);
                    };
                    warn!(attempt = attempt + 1, ?delay, %error, "operation failed, retrying");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    fn report_give_up<E: fmt::Display>(&self, error: &E, attempt: u32) {
        if attempt + 1 >= self.config.max_invocations() && attempt > 0 {
            warn!(attempts = attempt + 1, %error, "all retry attempts exhausted");
        } else {
            debug!(attempt = attempt + 1, %error, "error is not retried");
        }
    }
}

/// Pre-defined retry policies for common scenarios
pub mod policies {
    use super::{RetryDecision, RetryPolicy};

    /// Retries on any error
    #[derive(Debug, Clone, Copy)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Predicate-based retry policy
    #[derive(Debug, Clone, Copy)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E) -> bool,
    {
        fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
            if (self.predicate)(error) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }
}
