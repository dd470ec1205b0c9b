//! Fixed-delay retry shared by the backend and messaging legs.

use std::{future::Future, time::Duration};

use tokio_util::sync::CancellationToken;

use super::{error::RelayError, types::RelayResult};

/// How many times to retry an operation, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_attempts: u32,
    /// Constant delay between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Total attempts, including the initial one.
    pub fn total_attempts(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }
}

/// Runs an operation under a [`RetryPolicy`].
///
/// There is no backoff growth and no jitter. Logging is left to the caller.
#[derive(Debug, Clone, Copy)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Execute `operation` until it succeeds or the policy is spent.
    ///
    /// Both the attempt itself and the delay between attempts race against
    /// `cancel`; a cancelled context returns [`RelayError::Cancelled`] right away.
    pub async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, mut operation: F) -> RelayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RelayResult<T>>,
    {
        let total = self.policy.total_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RelayError::Cancelled),
                result = operation() => result,
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(RelayError::Cancelled) => return Err(RelayError::Cancelled),
                Err(err) => err,
            };

            if attempt >= total {
                return Err(RelayError::ExhaustedRetries { attempts: attempt, source: Box::new(err) });
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RelayError::Cancelled),
                _ = tokio::time::sleep(self.policy.delay) => {}
            }
        }
    }
}

// Tests.
