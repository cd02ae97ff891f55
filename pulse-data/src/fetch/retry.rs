//! Shared retry combinator applied uniformly by the fetch pipeline.
//!
//! Replaces per-dashboard ad hoc retry loops: one policy parameterised by
//! attempt count and backoff bounds, gated on [`FetchError::is_retryable`].

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::FetchError;

/// Exponential backoff policy: base delay doubles per attempt, capped.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first (3 = up to 2 retries).
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following attempt number `attempt` (zero-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `operation`, retrying transient failures with backoff.
    ///
    /// Non-retryable errors (4xx, malformed bodies, backend-reported failure)
    /// surface immediately.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt + 1 < self.max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(label, %error, ?delay, "transient fetch failure, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(5));
        assert_eq!(policy.backoff_delay(10), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_errors_retried_with_backoff() {
        let policy = RetryPolicy::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_in_op = Arc::clone(&attempts);

        let started = Instant::now();
        let result: Result<(), FetchError> = policy
            .run("history", move || {
                let attempts = Arc::clone(&attempts_in_op);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(FetchError::Network("connection reset".to_string()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // 1s + 2s of backoff elapsed on the paused clock.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_errors_not_retried() {
        let policy = RetryPolicy::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_in_op = Arc::clone(&attempts);

        let result: Result<(), FetchError> = policy
            .run("history", move || {
                let attempts = Arc::clone(&attempts_in_op);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(FetchError::Http {
                        status: 404,
                        status_text: "Not Found".to_string(),
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_after_transient_failure() {
        let policy = RetryPolicy::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_in_op = Arc::clone(&attempts);

        let result = policy
            .run("history", move || {
                let attempts = Arc::clone(&attempts_in_op);
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(FetchError::Timeout { timeout_secs: 10 })
                    } else {
                        Ok(42u32)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
