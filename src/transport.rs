//! Retry of outbound Telegram calls.
//!
//! Network failures and flood-control responses are retried with exponential
//! backoff plus jitter, up to `max_retries` extra attempts. A `RetryAfter`
//! response waits exactly as long as Telegram asks.

use std::future::Future;
use std::time::Duration;

use teloxide::{ApiError, RequestError};
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::errors::error_logging;
use crate::observability;

/// Delay before retry number `attempt` (1-based), in milliseconds.
///
/// `delay = min(base * 2^(attempt-1), max) + jitter`, jitter below `delay / 4`.
pub fn calculate_retry_delay(attempt: u32, retry: &RetryConfig) -> u64 {
    let exponent = attempt.saturating_sub(1).min(31);
    let delay = retry
        .base_retry_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(retry.max_retry_delay_ms);

    let jitter_range = delay / 4;
    let jitter = if jitter_range == 0 {
        0
    } else {
        rand::random::<u64>() % jitter_range
    };
    delay + jitter
}

/// Whether another attempt can succeed
pub fn is_retryable(error: &RequestError) -> bool {
    matches!(
        error,
        RequestError::Network(_) | RequestError::Io(_) | RequestError::RetryAfter(_)
    )
}

/// Editing a message to identical content is not a failure
pub fn is_message_not_modified(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::MessageNotModified))
}

/// Run `call` until it succeeds, fails permanently or retries run out
pub async fn with_retry<T, F, Fut>(
    operation: &'static str,
    chat_id: Option<i64>,
    retry: &RetryConfig,
    mut call: F,
) -> Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = %operation, attempt = attempt, "Telegram call succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if is_retryable(&error) && attempt <= retry.max_retries => {
                let delay = match &error {
                    RequestError::RetryAfter(seconds) => seconds.duration(),
                    _ => Duration::from_millis(calculate_retry_delay(attempt, retry)),
                };
                warn!(
                    operation = %operation,
                    error = %error,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Telegram call failed, retrying"
                );
                observability::record_telegram_retry(operation);
                tokio::time::sleep(delay).await;
            }
            Err(error) => {
                error_logging::log_network_error(&error, operation, chat_id, Some(attempt));
                observability::record_error_metrics("telegram", operation);
                return Err(error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_retry_delay_ms: 1,
            max_retry_delay_ms: 2,
        }
    }

    #[test]
    fn test_retry_delay_grows_and_caps() {
        let retry = RetryConfig {
            max_retries: 5,
            base_retry_delay_ms: 100,
            max_retry_delay_ms: 1000,
        };
        let first = calculate_retry_delay(1, &retry);
        assert!((100..125).contains(&first));
        let third = calculate_retry_delay(3, &retry);
        assert!((400..500).contains(&third));
        let capped = calculate_retry_delay(10, &retry);
        assert!((1000..1250).contains(&capped));
    }

    #[test]
    fn test_retry_delay_without_jitter_range() {
        let retry = RetryConfig {
            max_retries: 1,
            base_retry_delay_ms: 2,
            max_retry_delay_ms: 2,
        };
        assert_eq!(calculate_retry_delay(1, &retry), 2);
    }

    #[test]
    fn test_api_errors_are_not_retryable() {
        assert!(!is_retryable(&RequestError::Api(ApiError::MessageNotModified)));
        assert!(is_message_not_modified(&RequestError::Api(
            ApiError::MessageNotModified
        )));
    }

    #[tokio::test]
    async fn test_with_retry_retries_io_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result = with_retry("test_call", None, &fast_retry(3), move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(RequestError::Io(Arc::new(std::io::Error::other("reset"))))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.ok(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), RequestError> = with_retry("test_call", Some(1), &fast_retry(1), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(RequestError::Io(Arc::new(std::io::Error::other("reset"))))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_with_retry_does_not_retry_api_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), RequestError> = with_retry("test_call", None, &fast_retry(3), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(RequestError::Api(ApiError::BotBlocked))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
