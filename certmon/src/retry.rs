//! Bounded retry with exponential backoff.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use log::warn;
use thiserror::Error;

use crate::error::Retryable;

/// Default total number of attempts: one initial try plus three retries.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Terminal outcome of a retried operation.
#[derive(Debug, Error)]
pub enum RetryError<E: fmt::Debug + fmt::Display> {
    /// The operation failed with an error retrying cannot fix.
    #[error("{0}")]
    Terminal(E),
    /// Every attempt failed with a transient error.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Error returned by the final attempt.
        last: E,
    },
}

impl<E: fmt::Debug + fmt::Display> RetryError<E> {
    /// The underlying operation error.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Terminal(e) | RetryError::Exhausted { last: e, .. } => e,
        }
    }
}

/// Retry schedule for transient failures.
///
/// The delay before attempt `n` is `base_delay * 2^(n-2)`: the base delay
/// before the second attempt, doubling on each retry after that. Whether an
/// error is worth retrying is read off the error itself via [`Retryable`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with `max_attempts` total attempts.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            base_delay,
        }
    }

    fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(2))
    }

    /// Drives `op` until it succeeds, fails terminally or runs out of
    /// attempts.
    ///
    /// `op` receives the 1-based attempt number. Terminal errors return
    /// after a single invocation; backoff waits use the tokio timer, so
    /// concurrent probes keep running while one of them sleeps.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        E: Retryable + fmt::Debug + fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if !error.is_retryable() => return Err(RetryError::Terminal(error)),
                Err(error) if attempt >= max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: error,
                    })
                }
                Err(error) => {
                    let delay = self.delay_before(attempt + 1);
                    warn!("attempt {attempt}/{max_attempts} failed: {error}, retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
