//! Retry loop around a single remote call

use std::fmt;
use std::future::Future;

use super::policy::BackoffPolicy;

/// Errors that can tell whether the remote side rejected the call for rate reasons
pub trait Throttling {
    /// True for "rate exceeded" / "too many requests" class failures
    fn is_throttling(&self) -> bool;
}

/// Failure of a call made through [`BackoffExecutor`]
#[derive(Debug, thiserror::Error)]
pub enum BackoffError<E>
where
    E: fmt::Display + fmt::Debug,
{
    /// Every attempt was throttled
    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// A non-throttling failure, returned without retrying
    #[error("{0}")]
    Failed(E),
}

impl<E> BackoffError<E>
where
    E: fmt::Display + fmt::Debug,
{
    /// The underlying remote error
    pub fn into_inner(self) -> E {
        match self {
            BackoffError::Exhausted { last, .. } => last,
            BackoffError::Failed(e) => e,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, BackoffError::Exhausted { .. })
    }
}

/// Executes remote operations, retrying throttled attempts
///
/// The executor only holds the policy. Attempt counters live on the stack
/// of each `execute` call, so concurrent calls never inflate each other's
/// delays.
#[derive(Debug, Clone, Default)]
pub struct BackoffExecutor {
    policy: BackoffPolicy,
}

impl BackoffExecutor {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy }
    }

    /// Run `operation` until it succeeds, fails permanently, or runs out of attempts
    ///
    /// `label` only identifies the call in logs.
    pub async fn execute<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, BackoffError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Throttling + fmt::Display + fmt::Debug,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(call = %label, attempt, "Call succeeded after throttling");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_throttling() => return Err(BackoffError::Failed(e)),
                Err(e) if attempt >= max_attempts => {
                    tracing::error!(
                        call = %label,
                        attempts = attempt,
                        error = %e,
                        "Giving up on throttled call"
                    );
                    return Err(BackoffError::Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    let delay = self.policy.jittered_delay_for(attempt);
                    tracing::warn!(
                        call = %label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Throttled, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
