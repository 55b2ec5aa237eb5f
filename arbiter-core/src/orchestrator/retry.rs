//! Retry policy with exponential backoff and jitter
//!
//! The executor is provider-agnostic: it wraps any async operation returning
//! `ProviderResult` and retries it while the error classifies as retryable.

use crate::protocol::types::Request;
use crate::providers::error::ProviderError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds); doubles per attempt
    pub base_delay_ms: u64,

    /// Upper bound of the uniform random jitter added to each delay
    pub max_jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_jitter_ms: 500,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            ..Default::default()
        }
    }

    /// Create a policy that tries exactly once
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn with_max_jitter_ms(mut self, max_jitter_ms: u64) -> Self {
        self.max_jitter_ms = max_jitter_ms;
        self
    }

    /// This policy with the request's own retry overrides applied
    pub fn for_request(&self, request: &Request) -> Self {
        Self {
            max_attempts: request.retry_count.unwrap_or(self.max_attempts).max(1),
            base_delay_ms: request.retry_delay_ms.unwrap_or(self.base_delay_ms),
            max_jitter_ms: self.max_jitter_ms,
        }
    }

    /// Deterministic part of the delay after failed attempt `attempt` (1-based):
    /// `base * 2^(attempt-1)`
    pub fn backoff_floor(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let millis = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(millis)
    }

    /// Delay after failed attempt `attempt` (1-based), jitter included
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let jitter = if self.max_jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.max_jitter_ms)
        } else {
            0
        };
        self.backoff_floor(attempt) + Duration::from_millis(jitter)
    }

    /// Whether failed attempt `attempt` (1-based) should be retried
    pub fn should_retry(&self, error: &ProviderError, attempt: u32) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }
}

/// Successful outcome of a retried operation
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    pub value: T,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

/// Final failure of a retried operation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryFailure {
    /// The last error seen
    pub error: ProviderError,
    pub attempts: u32,
}

/// Executor for retry operations
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an operation, retrying retryable errors with backoff.
    ///
    /// Fails immediately on a non-retryable error, otherwise with the last
    /// error once `max_attempts` attempts are used.
    pub async fn execute<F, T, Fut>(&self, mut operation: F) -> Result<Retried<T>, RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    return Ok(Retried {
                        value,
                        attempts: attempt,
                    })
                }
                Err(error) => {
                    if !self.policy.should_retry(&error, attempt) {
                        if !error.is_retryable() {
                            debug!("Not retrying non-retryable error: {}", error);
                        }
                        return Err(RetryFailure {
                            error,
                            attempts: attempt,
                        });
                    }

                    let delay = self.policy.calculate_delay(attempt);
                    warn!(
                        "Attempt {}/{} failed: {}; retrying in {}ms",
                        attempt,
                        self.policy.max_attempts,
                        error,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Run `operation` under `RetryPolicy::new(max_attempts, base_delay_ms)`
pub async fn with_retry<F, T, Fut>(
    operation: F,
    max_attempts: u32,
    base_delay_ms: u64,
) -> Result<Retried<T>, RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    RetryExecutor::new(RetryPolicy::new(max_attempts, base_delay_ms))
        .execute(operation)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::TaskType;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay_ms, 1000);
        assert_eq!(policy.max_jitter_ms, 500);
    }

    #[test]
    fn test_exponential_backoff_floor() {
        let policy = RetryPolicy::new(5, 100);
        assert_eq!(policy.backoff_floor(1).as_millis(), 100);
        assert_eq!(policy.backoff_floor(2).as_millis(), 200);
        assert_eq!(policy.backoff_floor(3).as_millis(), 400);
        assert_eq!(policy.backoff_floor(4).as_millis(), 800);
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = RetryPolicy::new(3, 100);
        for attempt in 1..=4 {
            for _ in 0..50 {
                let delay = policy.calculate_delay(attempt);
                let floor = policy.backoff_floor(attempt);
                assert!(delay >= floor);
                assert!(delay <= floor + Duration::from_millis(500));
            }
        }
    }

    #[test]
    fn test_request_overrides() {
        let request = Request::new("p", TaskType::General)
            .with_retry_count(1)
            .with_retry_delay_ms(5);
        let policy = RetryPolicy::default().for_request(&request);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.base_delay_ms, 5);

        let zero = Request::new("p", TaskType::General).with_retry_count(0);
        assert_eq!(RetryPolicy::default().for_request(&zero).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let executor = RetryExecutor::new(RetryPolicy::new(3, 1).with_max_jitter_ms(0));

        let result = executor
            .execute(move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ProviderError::http(503, "unavailable"))
                } else {
                    Ok("done")
                }
            })
            .await
            .unwrap();

        assert_eq!(result.value, "done");
        assert_eq!(result.attempts, 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let executor = RetryExecutor::new(RetryPolicy::new(5, 1).with_max_jitter_ms(0));

        let failure = executor
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ProviderError::http(401, "bad key"))
            })
            .await
            .unwrap_err();

        assert_eq!(failure.attempts, 1);
        assert_eq!(failure.error.status(), Some(401));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let executor = RetryExecutor::new(RetryPolicy::new(3, 1).with_max_jitter_ms(0));

        let failure = executor
            .execute(move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ProviderError::http(500, format!("failure {}", n)))
            })
            .await
            .unwrap_err();

        assert_eq!(failure.attempts, 3);
        assert!(failure.error.to_string().contains("failure 2"));
    }

    #[tokio::test]
    async fn test_with_retry_reports_attempts_used() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result = with_retry(
            move || async move {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 => Err(ProviderError::Timeout(10)),
                    _ => Ok("done"),
                }
            },
            3,
            1,
        )
        .await
        .unwrap();

        assert_eq!(result.value, "done");
        assert_eq!(result.attempts, 2);
    }
}
