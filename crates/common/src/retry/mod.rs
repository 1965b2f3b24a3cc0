//! Reusable retry policy for transient failures
//!
//! Applies bounded attempts with exponential backoff to operations whose
//! failures may self-heal. Whether an error is retryable is decided by
//! `AppError::is_transient`, so configuration and validation failures
//! escape on the first attempt.

use crate::errors::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded exponential backoff: attempt n (0-based) sleeps base * 2^n
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            // At least one attempt must run
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff delay after a failed attempt (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }

    /// Run `op` until it succeeds, returns a non-transient error, or the
    /// attempt budget is exhausted. The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_secs = delay.as_secs_f64(),
                        error = %err,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl From<&crate::config::RetryConfig> for RetryPolicy {
    fn from(config: &crate::config::RetryConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_secs(1))
    }

    #[test]
    fn test_delays_double() {
        let policy = policy();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_retry_up_to_cap() {
        let attempts = AtomicU32::new(0);
        let policy = policy();

        let result: Result<()> = policy
            .run("always failing", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::transient("connection refused")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let policy = policy();

        let result = policy
            .run("flaky", || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(AppError::transient("timeout"))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configuration_errors_never_retry() {
        let attempts = AtomicU32::new(0);
        let policy = policy();

        let result: Result<()> = policy
            .run("bad secret", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::configuration("malformed secret")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_sleeps_between_attempts() {
        let policy = policy();
        let start = Instant::now();

        let _: Result<()> = policy
            .run("always failing", || async {
                Err(AppError::transient("unreachable"))
            })
            .await;

        // 1s after the first failure, 2s after the second (paused clock)
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
