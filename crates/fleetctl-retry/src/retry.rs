use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Doubling backoff policy: delay starts at `initial_delay`, doubles after
/// every failed attempt, and never exceeds `max_delay`. No jitter — unlike
/// the channel-reconnect loop this is generalized from, callers here don't
/// need to avoid a reconnect thundering herd.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(doublings).unwrap_or(u32::MAX);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("cancelled after {attempts} attempt(s): {last}")]
    Cancelled { attempts: u32, last: E },

    #[error("exhausted {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: E },
}

/// Retries `f` up to `policy.max_attempts` times, doubling the delay between
/// attempts and stopping early when `should_retry` returns `false` for the
/// latest error or `ctx` is cancelled.
///
/// Generalized from the exponential-backoff reconnect loop used elsewhere in
/// this codebase for channel adapters, with jitter removed since this helper
/// is not specific to reconnect storms.
pub async fn do_with_retry<T, E, Fut, F, ShouldRetry>(
    ctx: CancellationToken,
    policy: RetryPolicy,
    should_retry: ShouldRetry,
    mut f: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    ShouldRetry: Fn(&E) -> bool,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;

        if ctx.is_cancelled() {
            // Only reachable if cancelled before the first attempt runs;
            // otherwise cancellation is observed after a failed attempt below.
            let err = f().await;
            return match err {
                Ok(v) => Ok(v),
                Err(last) => Err(RetryError::Cancelled { attempts: attempt, last }),
            };
        }

        match f().await {
            Ok(v) => return Ok(v),
            Err(err) => {
                let retryable = should_retry(&err) && attempt < policy.max_attempts;
                if !retryable {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }

                let delay = policy.delay_for_attempt(attempt);
                tokio::select! {
                    _ = ctx.cancelled() => {
                        return Err(RetryError::Cancelled { attempts: attempt, last: err });
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result: Result<u32, &'static str> = do_with_retry(
            CancellationToken::new(),
            RetryPolicy::default(),
            |_| true,
            move || {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        };

        let result: Result<&'static str, &'static str> = do_with_retry(
            CancellationToken::new(),
            policy,
            |_| true,
            move || {
                let calls = calls2.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err("not yet")
                    } else {
                        Ok("done")
                    }
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };

        let result: Result<(), &'static str> =
            do_with_retry(CancellationToken::new(), policy, |_| true, || async {
                Err("always fails")
            })
            .await;

        match result {
            Err(RetryError::Exhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn should_retry_false_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result: Result<(), &'static str> = do_with_retry(
            CancellationToken::new(),
            RetryPolicy::default(),
            |_| false,
            move || {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("non-retryable")
                }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_retry_loop() {
        let ctx = CancellationToken::new();
        let ctx2 = ctx.clone();
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(50),
        };

        let handle = tokio::spawn(async move {
            do_with_retry(ctx2, policy, |_| true, || async { Err::<(), _>("fail") }).await
        });

        tokio::time::sleep(Duration::from_millis(5)).await;
        ctx.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(RetryError::Cancelled { .. })));
    }
}
