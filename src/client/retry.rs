//! Async retry with exponential backoff and jitter, per spec §4.8/§5: the
//! loop checks cancellation between attempts and never retries a
//! non-retryable error.

use crate::config::RetryConfig;
use crate::error::ClientError;
use std::time::Duration;

/// One attempt's delay before the *next* attempt, per spec §4.8:
/// `backoff_seconds * backoff_multiplier^attempt`, plus up to `jitter`.
fn delay_for_attempt(config: &RetryConfig, attempt: u32) -> Duration {
    let exponent = config.backoff_multiplier.powi(attempt as i32);
    let base = config.backoff.mul_f64(exponent);
    let jitter = config.jitter.mul_f64(rand::random::<f64>());
    base + jitter
}

/// Runs `attempt` up to `config.max_attempts` times, retrying only on
/// [`ClientError::is_retryable`] errors, sleeping between attempts per
/// [`delay_for_attempt`]. Per spec §5, cancellation (the caller's future
/// being dropped) simply unwinds the `await` — no failure is recorded.
pub async fn retry_with_policy<T, F, Fut>(config: &RetryConfig, mut attempt: F) -> Result<T, ClientError>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, ClientError>>,
{
    let mut last_err = None;
    for n in 0..config.max_attempts {
        match attempt(n).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && n + 1 < config.max_attempts => {
                let delay = delay_for_attempt(config, n);
                tracing::debug!(attempt = n + 1, ?delay, error = %err, "retrying after failure");
                tokio::time::sleep(delay).await;
                last_err = Some(err);
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_err.expect("loop runs at least once since max_attempts >= 1"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            backoff: Duration::from_millis(1),
            backoff_multiplier: 1.0,
            jitter: Duration::from_millis(0),
            retryable_status_codes: vec![429, 502, 503, 504],
        }
    }

    #[tokio::test]
    async fn succeeds_on_final_attempt_within_budget() {
        let attempts = AtomicU32::new(0);
        let config = fast_config(3);
        let result = retry_with_policy(&config, |_n| {
            let count = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < 2 {
                    Err(ClientError::FusekiConnectError("down".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausting_attempts_surfaces_last_error() {
        let config = fast_config(2);
        let result: Result<(), ClientError> = retry_with_policy(&config, |_n| async {
            Err(ClientError::FusekiConnectError("down".to_string()))
        })
        .await;
        assert!(matches!(result, Err(ClientError::FusekiConnectError(_))));
    }

    #[tokio::test]
    async fn non_retryable_error_fails_immediately() {
        let attempts = AtomicU32::new(0);
        let config = fast_config(3);
        let result: Result<(), ClientError> = retry_with_policy(&config, |_n| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ClientError::BadRequest("nope".to_string())) }
        })
        .await;
        assert!(matches!(result, Err(ClientError::BadRequest(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
