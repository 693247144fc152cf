use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry behavior for network-backed steps. The default performs no retries,
/// matching the adapters' own no-retry contract; callers opt in per
/// pipeline.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first. 1 disables retries.
    pub attempts: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
            ..Self::default()
        }
    }
}

/// Runs `operation` until it succeeds, the error is not retryable, or the
/// policy's attempts are spent.
pub(crate) async fn run_with_retries<T, E, F, Fut>(
    policy: RetryPolicy,
    is_retryable: fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < attempts && is_retryable(&error) => {
                let delay = policy.backoff * 2u32.saturating_pow(attempt - 1);
                warn!(%error, attempt, "retrying after backoff");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct FakeError {
        retryable: bool,
    }

    impl std::fmt::Display for FakeError {
        fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(formatter, "fake error")
        }
    }

    fn retryable(error: &FakeError) -> bool {
        error.retryable
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        tokio::time::pause();
        let calls = AtomicU32::new(0);

        let result = run_with_retries(RetryPolicy::with_attempts(3), retryable, || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call < 2 {
                    Err(FakeError { retryable: true })
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_failures_stop_immediately() {
        let calls = AtomicU32::new(0);

        let result: Result<&str, FakeError> =
            run_with_retries(RetryPolicy::with_attempts(5), retryable, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FakeError { retryable: false }) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn default_policy_never_retries() {
        let calls = AtomicU32::new(0);

        let result: Result<&str, FakeError> =
            run_with_retries(RetryPolicy::default(), retryable, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FakeError { retryable: true }) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
