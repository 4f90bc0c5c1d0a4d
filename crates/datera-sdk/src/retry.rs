//! Retry loop for transient failures.

use datera_core::client::RetryPolicy;
use datera_core::{ApiErrorResponse, Error, Result};
use std::future::Future;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Run `attempt` until it succeeds, fails permanently, or the policy's time
/// budget runs out.
///
/// Only 503 responses and refused connections are retried; retry `n` sleeps
/// `backoff_unit * n²`. On exhaustion the last API error seen is returned
/// inside [`Error::RetryTimeout`].
pub async fn retry_transient<T, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let mut backoff: u32 = 1;
    let mut last: Option<Box<ApiErrorResponse>> = None;

    while started.elapsed() < policy.timeout {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => {
                if let Some(response) = err.api_error() {
                    last = Some(Box::new(response.clone()));
                }
                let delay = policy.delay_for_attempt(backoff);
                debug!(
                    backoff,
                    outcome = ?err.outcome(),
                    "Retrying Datera request after {:?}",
                    delay
                );
                sleep(delay).await;
                backoff = backoff.saturating_add(1);
            }
            Err(err) => return Err(err),
        }
    }

    Err(Error::RetryTimeout { last })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn fast_policy(timeout: Duration) -> RetryPolicy {
        RetryPolicy::new()
            .with_timeout(timeout)
            .with_backoff_unit(Duration::from_millis(1))
    }

    fn unavailable() -> Error {
        Error::api(ApiErrorResponse::from_status(503))
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(&fast_policy(Duration::from_secs(5)), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>("done")
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_503_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(&fast_policy(Duration::from_secs(5)), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(unavailable())
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_refused_connections() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(&fast_policy(Duration::from_secs(5)), || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::ConnectionRefused("connection refused".to_string()))
            } else {
                Ok(())
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn terminal_errors_return_immediately() {
        for err in [
            Error::api(ApiErrorResponse::from_status(400)),
            Error::api(ApiErrorResponse::from_status(401)),
            Error::api(ApiErrorResponse::from_status(500)),
            Error::HttpError("reset".to_string()),
            Error::Timeout("slow".to_string()),
        ] {
            let calls = AtomicU32::new(0);
            let expected = err.clone();
            let result: Result<()> = retry_transient(&fast_policy(Duration::from_secs(5)), || {
                calls.fetch_add(1, Ordering::SeqCst);
                let err = err.clone();
                async move { Err(err) }
            })
            .await;

            assert_eq!(result.unwrap_err(), expected);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn exhausted_budget_carries_last_api_error() {
        let result: Result<()> =
            retry_transient(&fast_policy(Duration::from_millis(30)), || async {
                Err(unavailable())
            })
            .await;

        match result {
            Err(Error::RetryTimeout { last }) => {
                assert_eq!(last.map(|response| response.http), Some(503));
            }
            other => panic!("expected RetryTimeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exhausted_budget_after_refusals_has_no_api_error() {
        let result: Result<()> =
            retry_transient(&fast_policy(Duration::from_millis(20)), || async {
                Err(Error::ConnectionRefused("connection refused".to_string()))
            })
            .await;

        assert_eq!(result.unwrap_err(), Error::RetryTimeout { last: None });
    }

    #[tokio::test]
    async fn zero_budget_makes_no_attempt() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(&fast_policy(Duration::ZERO), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(())
        })
        .await;

        assert!(matches!(result, Err(Error::RetryTimeout { last: None })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_quadratically() {
        let attempts = Mutex::new(Vec::new());
        let result = retry_transient(&RetryPolicy::new(), || async {
            let mut attempts = attempts.lock().unwrap();
            attempts.push(Instant::now());
            if attempts.len() < 5 {
                Err(unavailable())
            } else {
                Ok(())
            }
        })
        .await;
        assert!(result.is_ok());

        let attempts = attempts.into_inner().unwrap();
        let gaps: Vec<Duration> = attempts.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(4),
                Duration::from_secs(9),
                Duration::from_secs(16),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn default_budget_allows_ten_attempts() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();
        let result: Result<()> = retry_transient(&RetryPolicy::new(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;

        assert!(matches!(result, Err(Error::RetryTimeout { .. })));
        // attempts at 0, 1, 5, 14, 30, 55, 91, 140, 204 and 285 seconds
        assert_eq!(calls.load(Ordering::SeqCst), 10);
        assert_eq!(started.elapsed(), Duration::from_secs(385));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_request_returns_without_sleeping() {
        let started = Instant::now();
        let result: Result<()> = retry_transient(&RetryPolicy::new(), || async {
            Err(Error::api(ApiErrorResponse::from_status(400)))
        })
        .await;

        assert_eq!(result.unwrap_err().http_status(), Some(400));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
