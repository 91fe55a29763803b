//! Bounded exponential-backoff retry.
//!
//! Only [`FetchError::is_retryable`] failures are re-attempted. The delay
//! after attempt *k* is `initial_delay × backoff_multiplier^(k−1)`. Sleeps
//! go through [`tokio::time::sleep`], so a backing-off call never blocks the
//! other operations sharing the scheduler.

use std::future::Future;
use std::time::Duration;

use crate::error::FetchError;

/// Retry configuration for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Treated as at least 1.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Growth factor applied to the delay after each further failure.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a policy from its three parameters.
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_multiplier: f64) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff_multiplier,
        }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// The full schedule of inter-attempt delays (`max_attempts − 1` entries).
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts.max(1))
            .map(|attempt| self.delay_after(attempt))
            .collect()
    }

    /// Run `operation` until it succeeds, fails terminally, or attempts run out.
    ///
    /// `operation` receives the 1-based attempt number. After the final
    /// attempt the last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        label,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn rate_limited() -> FetchError {
        FetchError::RateLimited {
            target: "https://a.test".into(),
            status: 429,
        }
    }

    #[test]
    fn default_schedule_is_one_then_two_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.schedule(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[test]
    fn delay_grows_geometrically() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), 3.0);
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(300));
        assert_eq!(policy.delay_after(3), Duration::from_millis(900));
    }

    #[test]
    fn no_retry_has_empty_schedule() {
        assert!(RetryPolicy::no_retry().schedule().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn observed_delays_match_schedule() {
        let policy = RetryPolicy::default();
        let stamps = Mutex::new(Vec::new());

        let result: Result<(), FetchError> = policy
            .run("test", |_| {
                if let Ok(mut s) = stamps.lock() {
                    s.push(Instant::now());
                }
                async { Err(rate_limited()) }
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), FailureKind::RateLimited);
        let stamps = stamps.into_inner().expect("lock");
        assert_eq!(stamps.len(), 3);
        let gaps: Vec<u64> = stamps
            .windows(2)
            .map(|w| (w[1] - w[0]).as_secs())
            .collect();
        assert_eq!(gaps, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::default()
            .run("test", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(FetchError::Timeout {
                            target: "https://a.test".into(),
                            detail: "timed out".into(),
                        })
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;
        assert_eq!(result.expect("third attempt succeeds"), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_errors_are_not_retried() {
        for err in [
            FetchError::NotFound {
                target: "https://a.test".into(),
            },
            FetchError::PriorFailure {
                target: "https://a.test".into(),
            },
            FetchError::Parse("bad".into()),
        ] {
            let calls = AtomicU32::new(0);
            let expected = err.kind();
            let result: Result<(), FetchError> = RetryPolicy::default()
                .run("test", |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let err = err.clone();
                    async move { Err(err) }
                })
                .await;
            assert_eq!(result.unwrap_err().kind(), expected);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(0, Duration::from_secs(1), 2.0);
        let _: Result<(), FetchError> = policy
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(rate_limited()) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
