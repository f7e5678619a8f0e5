//! Bounded retry with capped exponential backoff.
//!
//! The publisher retries whole files with it; the S3 store retries single
//! multipart segments with the same schedule.

use std::future::Future;
use std::time::Duration;

use crate::config::publisher::PublisherConfig;
use crate::error::{AppError, ErrorKind};
use crate::result::AppResult;

/// Attempt budget and delay schedule for one operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Build a policy from the publisher configuration.
    pub fn from_config(config: &PublisherConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            ..Self::default()
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exp);
        Duration::from_secs_f64(secs.min(self.max_backoff.as_secs_f64()))
    }

    /// Run `op` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// The last error is returned; `attempts` in the log counts every try.
    pub async fn run<T, F, Fut>(&self, key: &str, mut op: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts || !is_retryable(&e) => {
                    tracing::debug!(key, attempts = attempt, error = %e, "Giving up");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::debug!(
                        key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Errors that another attempt cannot fix.
fn is_retryable(err: &AppError) -> bool {
    !matches!(
        err.kind,
        ErrorKind::NotFound | ErrorKind::Validation | ErrorKind::Configuration
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_delay_doubles_up_to_ceiling() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(5));
        assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = fast()
            .run("k", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AppError::external_service("network error: reset"))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_is_bounded() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = fast()
            .run("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::external_service("timed out"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = fast()
            .run("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::not_found("NoSuchBucket"))
            })
            .await;
        assert_eq!(result.unwrap_err().kind, ErrorKind::NotFound);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
