//! Bounded exponential backoff for provider HTTP calls
//!
//! Only transient failures are retried: connection problems, timeouts, HTTP 429 and 5xx.
//! Everything else (bad credentials, malformed requests) fails on the first attempt.

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::RetryConfig;
use crate::error::Error;

/// A failed attempt and whether trying again could help
#[derive(Debug)]
pub struct AttemptError {
    pub error: Error,
    pub transient: bool,
}

impl AttemptError {
    pub fn transient(error: Error) -> Self {
        Self { error, transient: true }
    }

    pub fn permanent(error: Error) -> Self {
        Self { error, transient: false }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: StatusCode, error: Error) -> Self {
        Self {
            error,
            transient: is_transient_status(status),
        }
    }

    /// Classify a transport-level failure
    pub fn from_transport(err: &reqwest::Error, error: Error) -> Self {
        Self {
            error,
            transient: err.is_timeout() || err.is_connect() || err.is_request(),
        }
    }
}

pub fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Retry schedule shared by every outbound client
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// No retries at all
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (0-based): base * 2^attempt, capped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails permanently, or retries run out
    pub async fn run<F, Fut, T>(&self, label: &str, mut operation: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let mut attempt = 0u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(failure) if failure.transient && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        label,
                        attempt + 1,
                        self.max_retries + 1,
                        delay,
                        failure.error
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(failure) => return Err(failure.error),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1), Duration::from_millis(2))
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(500), Duration::from_secs(3));
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_secs(3));
        assert_eq!(policy.delay_for(40), Duration::from_secs(3));
    }

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::BAD_GATEWAY));
        assert!(!is_transient_status(StatusCode::UNAUTHORIZED));
        assert!(!is_transient_status(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn test_transient_failure_retried_until_success() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result = fast_policy(3)
            .run("flaky", || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(AttemptError::transient(Error::IndexWrite("503".into())))
                } else {
                    Ok(n)
                }
            })
            .await;

        tokio_test::assert_ok!(&result);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: Result<(), Error> = fast_policy(2)
            .run("down", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AttemptError::transient(Error::IndexQuery("timeout".into())))
            })
            .await;

        assert!(matches!(result, Err(Error::IndexQuery(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: Result<(), Error> = fast_policy(5)
            .run("auth", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AttemptError::permanent(Error::generation_auth("401")))
            })
            .await;

        tokio_test::assert_err!(&result);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
