//! Bounded retry with exponential backoff

use crate::config::CollectorConfig;
use crate::error::SourceError;
use std::future::Future;
use std::time::Duration;

/// How many times to try a request and how long to wait between tries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first; at least 1
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (1-based)
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let mut backoff = self.initial_backoff;
        for _ in 1..attempt {
            backoff = std::cmp::min(backoff.saturating_mul(2), self.max_backoff);
        }
        backoff.min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&CollectorConfig::default())
    }
}

impl From<&CollectorConfig> for RetryPolicy {
    fn from(config: &CollectorConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
        }
    }
}

/// Result of a retried request with the number of attempts it took
#[derive(Debug)]
pub struct Attempted<T> {
    pub attempts: u32,
    pub result: Result<T, SourceError>,
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up.
///
/// `on_retry` is called with the failed attempt number, the delay about to
/// be slept and the error, before each retry.
pub async fn with_retry<T, F, Fut, R>(policy: &RetryPolicy, mut op: F, mut on_retry: R) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
    R: FnMut(u32, Duration, &SourceError),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                return Attempted {
                    attempts: attempt,
                    result: Ok(value),
                }
            }
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                let backoff = policy.backoff_after(attempt);
                on_retry(attempt, backoff, &err);
                tokio::time::sleep(backoff).await;
            }
            Err(err) => {
                return Attempted {
                    attempts: attempt,
                    result: Err(err),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 6,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(2),
        };
        assert_eq!(policy.backoff_after(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff_after(3), Duration::from_millis(2000));
        assert_eq!(policy.backoff_after(4), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let mut retries = Vec::new();

        let outcome = with_retry(
            &fast_policy(3),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(SourceError::Transient("throttled".into()))
                    } else {
                        Ok(42)
                    }
                }
            },
            |attempt, _, _| retries.push(attempt),
        )
        .await;

        assert_eq!(outcome.result, Ok(42));
        assert_eq!(outcome.attempts, 3);
        assert_eq!(retries, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let outcome: Attempted<()> = with_retry(
            &fast_policy(3),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SourceError::Transient("503".into())) }
            },
            |_, _, _| {},
        )
        .await;

        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(outcome.result, Err(SourceError::Transient(_))));
    }

    #[tokio::test]
    async fn test_permanent_errors_not_retried() {
        let calls = AtomicU32::new(0);

        let outcome: Attempted<()> = with_retry(
            &fast_policy(5),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SourceError::PermissionDenied("denied".into())) }
            },
            |_, _, _| {},
        )
        .await;

        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
