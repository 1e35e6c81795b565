//! Retry with exponential backoff and jitter
//!
//! [`RetryExecutor`] wraps a zero-argument async operation and re-runs it on
//! retryable failures, sleeping `min(base * exponential_base^attempt,
//! max_delay)` with ±25% jitter between attempts. The executor keeps no
//! state between calls, so one instance can be shared by every concurrent
//! caller.

use crate::{DriftError, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Backoff and retryability policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = max_retries + 1)
    pub max_retries: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound on any single backoff sleep
    pub max_delay: Duration,

    /// Growth factor per attempt
    pub exponential_base: f64,

    /// HTTP statuses worth retrying; other statuses fail fast
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            exponential_base: 2.0,
            retryable_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// Computes the backoff before retrying `attempt` (0-based), with
    /// symmetric ±25% jitter. The result is always within
    /// `[0.75 * delay, 1.25 * delay]` of the un-jittered delay.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = self.exponential_base.powi(attempt as i32);
        let delay = (self.base_delay.as_secs_f64() * exponent).min(self.max_delay.as_secs_f64());

        let jitter = rand::thread_rng().gen_range(-0.25..=0.25) * delay;
        Duration::from_secs_f64((delay + jitter).max(0.0))
    }
}

/// Runs async operations under a [`RetryPolicy`]
#[derive(Debug, Clone, Default)]
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

    /// Runs `operation` up to `max_retries + 1` times.
    ///
    /// Non-retryable errors propagate immediately without consuming a retry.
    /// When every attempt fails, the caller receives
    /// [`DriftError::ExhaustedRetries`] with the final failure attached.
    ///
    /// `url` only labels log lines and the exhaustion error.
    pub async fn execute<T, F, Fut>(&self, url: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        for attempt in 0..=self.policy.max_retries {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !error.is_retryable(&self.policy.retryable_statuses) {
                        return Err(error);
                    }

                    if attempt == self.policy.max_retries {
                        tracing::error!(
                            "All {} attempts failed for {}: {}",
                            self.policy.max_retries + 1,
                            url,
                            error
                        );
                        return Err(DriftError::ExhaustedRetries {
                            url: url.to_string(),
                            attempts: self.policy.max_retries + 1,
                            source: Box::new(error),
                        });
                    }

                    let delay = self.policy.calculate_delay(attempt);
                    tracing::warn!(
                        "Attempt {}/{} failed for {} ({}), retrying in {:?}",
                        attempt + 1,
                        self.policy.max_retries + 1,
                        url,
                        error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        unreachable!("retry loop returns on the final attempt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            exponential_base: 2.0,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_delay_bounded_by_jitter_envelope() {
        let policy = RetryPolicy::default();
        for attempt in 0..6 {
            let expected = (1.0_f64 * 2.0_f64.powi(attempt)).min(60.0);
            for _ in 0..50 {
                let delay = policy.calculate_delay(attempt as u32).as_secs_f64();
                assert!(
                    delay >= expected * 0.75 - 1e-9 && delay <= expected * 1.25 + 1e-9,
                    "attempt {}: delay {} outside [{}, {}]",
                    attempt,
                    delay,
                    expected * 0.75,
                    expected * 1.25
                );
            }
        }
    }

    #[test]
    fn test_delay_capped_at_max() {
        let policy = RetryPolicy::default();
        // 2^10 seconds would be ~17 minutes without the cap.
        let delay = policy.calculate_delay(10);
        assert!(delay <= Duration::from_secs_f64(60.0 * 1.25));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let executor = RetryExecutor::new(fast_policy(3));
        let calls = AtomicU32::new(0);

        let result: Result<u32> = executor
            .execute("https://example.com/", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(7) }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let executor = RetryExecutor::new(fast_policy(3));
        let calls = AtomicU32::new(0);

        let result: Result<&str> = executor
            .execute("https://example.com/", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(DriftError::Transport {
                            url: "https://example.com/".to_string(),
                            message: "connection reset".to_string(),
                        })
                    } else {
                        Ok("body")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "body");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_carries_last_error() {
        let executor = RetryExecutor::new(fast_policy(2));
        let calls = AtomicU32::new(0);

        let result: Result<()> = executor
            .execute("https://example.com/", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(DriftError::HttpStatus {
                        url: "https://example.com/".to_string(),
                        status: 503,
                    })
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(DriftError::ExhaustedRetries {
                attempts, source, ..
            }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(
                    *source,
                    DriftError::HttpStatus { status: 503, .. }
                ));
            }
            other => panic!("expected ExhaustedRetries, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_retryable_fails_fast() {
        let executor = RetryExecutor::new(fast_policy(3));
        let calls = AtomicU32::new(0);

        let result: Result<()> = executor
            .execute("https://example.com/", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(DriftError::HttpStatus {
                        url: "https://example.com/".to_string(),
                        status: 404,
                    })
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(DriftError::HttpStatus { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_validation_error_not_retried() {
        let executor = RetryExecutor::new(fast_policy(3));
        let calls = AtomicU32::new(0);

        let result: Result<()> = executor
            .execute("bad-url", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(DriftError::Validation(crate::UrlError::Parse(
                        "bad-url".to_string(),
                    )))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(DriftError::Validation(_))));
    }
}
