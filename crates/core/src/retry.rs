//! Bounded Retry with Credential Rotation
//!
//! Wraps a single backend invocation with the orchestrator's recovery
//! policy: rate-limit class failures rotate the credential pool and back
//! off exponentially; every other failure is re-raised immediately.
//! Only quota pressure is treated as recoverable by substituting a
//! credential.

use crate::backend::{BackendError, BackendResponse};
use crate::credentials::CredentialPool;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Upper bound, in seconds, on a single backoff sleep.
const MAX_BACKOFF_SECS: u64 = 10;

/// Executes `operation` up to `max_attempts` times.
///
/// The operation receives the pool's current credential on every attempt.
/// On a rate-limited failure the pool is rotated and the task sleeps for
/// `min(2^attempt, 10)` seconds before retrying, unless the attempt was
/// the last, in which case the error is re-raised as-is (so `max_attempts`
/// calls produce at most `max_attempts - 1` rotations). Non-rate-limit
/// failures propagate immediately without rotating or sleeping.
pub async fn call_with_retry<F, Fut>(
    pool: &mut CredentialPool,
    max_attempts: u32,
    mut operation: F,
) -> Result<BackendResponse, BackendError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<BackendResponse, BackendError>>,
{
    for attempt in 0..max_attempts {
        let credential = pool.current().to_string();
        match operation(credential).await {
            Ok(response) => return Ok(response),
            Err(err) if err.is_rate_limit() => {
                warn!(attempt = attempt + 1, error = %err, "backend call rate limited");
                if attempt + 1 == max_attempts {
                    return Err(err);
                }
                pool.rotate();
                let wait = Duration::from_secs(backoff_secs(attempt));
                info!(wait_secs = wait.as_secs(), "backing off before retry");
                tokio::time::sleep(wait).await;
            }
            Err(err) => {
                warn!(attempt = attempt + 1, error = %err, "backend call failed, not retrying");
                return Err(err);
            }
        }
    }
    Err(BackendError::RetriesExhausted(max_attempts))
}

fn backoff_secs(attempt: u32) -> u64 {
    2u64.saturating_pow(attempt).min(MAX_BACKOFF_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn pool_of(n: usize) -> CredentialPool {
        CredentialPool::new((0..n).map(|i| format!("key-{i}")).collect()).unwrap()
    }

    fn ok_response() -> BackendResponse {
        BackendResponse {
            text: "ok".to_string(),
            total_tokens: Some(5),
        }
    }

    #[test]
    fn backoff_is_exponential_and_capped() {
        assert_eq!(backoff_secs(0), 1);
        assert_eq!(backoff_secs(1), 2);
        assert_eq!(backoff_secs(2), 4);
        assert_eq!(backoff_secs(3), 8);
        assert_eq!(backoff_secs(4), 10);
        assert_eq!(backoff_secs(30), 10);
    }

    #[tokio::test]
    async fn first_attempt_success_never_rotates() {
        let mut pool = pool_of(3);
        let result = call_with_retry(&mut pool, 3, |credential| async move {
            assert_eq!(credential, "key-0");
            Ok(ok_response())
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(pool.current(), "key-0");
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_rate_limiting_rotates_then_reraises() {
        let mut pool = pool_of(3);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_op = calls.clone();

        let result = call_with_retry(&mut pool, 3, move |_credential| {
            let calls = calls_in_op.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BackendError::RateLimited("429".to_string()))
            }
        })
        .await;

        // Three calls, two rotations, final error re-raised untouched.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(pool.current(), "key-2");
        assert!(matches!(result, Err(BackendError::RateLimited(_))));
    }

    #[tokio::test]
    async fn non_rate_limit_errors_fail_fast() {
        let mut pool = pool_of(3);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_op = calls.clone();

        let result = call_with_retry(&mut pool, 3, move |_credential| {
            let calls = calls_in_op.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BackendError::Api("bad schema".to_string()))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(pool.current(), "key-0");
        assert!(matches!(result, Err(BackendError::Api(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_then_success_uses_the_rotated_credential() {
        let mut pool = pool_of(2);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_op = calls.clone();

        let result = call_with_retry(&mut pool, 3, move |credential| {
            let calls = calls_in_op.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    assert_eq!(credential, "key-0");
                    Err(BackendError::RateLimited("429".to_string()))
                } else {
                    assert_eq!(credential, "key-1");
                    Ok(ok_response())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_sleeps_grow_between_attempts() {
        let mut pool = pool_of(4);
        let start = Instant::now();

        let _ = call_with_retry(&mut pool, 4, move |_credential| async move {
            Err::<BackendResponse, _>(BackendError::RateLimited("429".to_string()))
        })
        .await;

        // Sleeps of 1, 2 and 4 seconds separate the four attempts; the
        // final attempt re-raises without sleeping.
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn single_attempt_reraises_without_rotating() {
        let mut pool = pool_of(3);
        let result = call_with_retry(&mut pool, 1, move |_credential| async move {
            Err::<BackendResponse, _>(BackendError::RateLimited("429".to_string()))
        })
        .await;
        assert!(matches!(result, Err(BackendError::RateLimited(_))));
        assert_eq!(pool.current(), "key-0");
    }
}
