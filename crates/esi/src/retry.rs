//! Bounded retry with exponential backoff for transient ESI failures.

use std::future::Future;
use std::time::Duration;

use crate::error::EsiError;

/// Backoff behavior for retrying transient ESI failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_multiplier: f64,
    /// Retries after the initial attempt.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            max_retries: 3,
        }
    }
}

/// Computes the next backoff delay given the current delay and policy.
pub fn next_delay(current: Duration, policy: &RetryPolicy) -> Duration {
    let next = current.mul_f64(policy.backoff_multiplier);
    if next > policy.max_delay {
        policy.max_delay
    } else {
        next
    }
}

/// Runs `call` until it succeeds, fails with a non-retryable error, or
/// the retry budget is spent. Only [`EsiError::is_retryable`] failures
/// are retried; everything else surfaces immediately.
pub async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, EsiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EsiError>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt = 0u32;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                tracing::warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient ESI failure, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = next_delay(delay, policy);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn delay_doubles_until_capped() {
        let policy = RetryPolicy::default();
        let d1 = next_delay(Duration::from_secs(1), &policy);
        assert_eq!(d1, Duration::from_secs(2));
        let d2 = next_delay(d1, &policy);
        assert_eq!(d2, Duration::from_secs(4));
        let capped = next_delay(Duration::from_secs(20), &policy);
        assert_eq!(capped, Duration::from_secs(30));
    }

    #[test]
    fn full_backoff_sequence() {
        let policy = RetryPolicy::default();
        let mut delay = policy.initial_delay;
        let mut sequence = vec![delay.as_secs()];
        for _ in 0..7 {
            delay = next_delay(delay, &policy);
            sequence.push(delay.as_secs());
        }
        assert_eq!(sequence, vec![1, 2, 4, 8, 16, 30, 30, 30]);
    }

    #[tokio::test]
    async fn succeeds_without_retries() {
        let policy = RetryPolicy::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = with_retries(&policy, "test", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, EsiError>(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        };
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = with_retries(&policy, "test", move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(EsiError::ServerError {
                        status: 503,
                        body: String::new(),
                    })
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_surface_immediately() {
        let policy = RetryPolicy::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: Result<(), EsiError> = with_retries(&policy, "test", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(EsiError::Forbidden)
            }
        })
        .await;

        assert_matches!(result, Err(EsiError::Forbidden));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_retry_budget() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(1),
            max_retries: 2,
            ..RetryPolicy::default()
        };
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: Result<(), EsiError> = with_retries(&policy, "test", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(EsiError::ServerError {
                    status: 502,
                    body: String::new(),
                })
            }
        })
        .await;

        assert_matches!(result, Err(EsiError::ServerError { status: 502, .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
