//! Retry policy and the generic retry loop used around upstream calls.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

/// Default number of total attempts (first call included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Specifies the backoff strategy between attempts.
#[derive(Clone, Debug, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// Delay is `base * factor^(retry - 1)`, capped at `max`.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
    },
}

/// Static retry configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds (fixed backoff).
    pub delay_ms: u64,
    #[serde(skip)]
    backoff: Option<Backoff>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
            backoff: None,
        }
    }
}

impl RetryPolicy {
    /// Fixed-delay policy.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay_ms: delay.as_millis() as u64,
            backoff: None,
        }
    }

    /// Replaces the backoff strategy.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = Some(backoff);
        self
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
            .clone()
            .unwrap_or(Backoff::Fixed(Duration::from_millis(self.delay_ms)))
    }

    /// Longest a full run can take when every attempt uses `per_attempt`
    /// before failing, delays between attempts included.
    pub fn worst_case(&self, per_attempt: Duration) -> Duration {
        let attempts = self.attempts();
        let running = per_attempt.saturating_mul(attempts);
        match self.backoff() {
            Backoff::Fixed(delay) => running.saturating_add(delay.saturating_mul(attempts - 1)),
            Backoff::Exponential { max, .. } => {
                let mut total = running;
                for attempt in 1..attempts {
                    let delay = self.delay_for(attempt);
                    if delay >= max {
                        let rest = attempts - attempt;
                        return total.saturating_add(max.saturating_mul(rest));
                    }
                    total = total.saturating_add(delay);
                }
                total
            }
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff() {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, factor, max } => {
                let exponent = attempt.saturating_sub(1) as i32;
                let secs = base.as_secs_f64() * factor.powi(exponent);
                if !secs.is_finite() || secs >= max.as_secs_f64() {
                    max
                } else {
                    Duration::from_secs_f64(secs)
                }
            }
        }
    }
}

/// Runs `operation` until it succeeds, fails with an error `is_retryable`
/// rejects, or `policy.attempts()` attempts have been made.
///
/// The last error is returned when the budget runs out.
pub async fn retry_with_policy<T, E, Op, Fut, P>(
    policy: &RetryPolicy,
    mut operation: Op,
    is_retryable: P,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts && is_retryable(&err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying upstream call"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts(), 3);
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(500));
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let policy = RetryPolicy::fixed(0, Duration::ZERO);
        assert_eq!(policy.attempts(), 1);
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = RetryPolicy::default().with_backoff(Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_millis(350),
        });
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
    }

    #[test]
    fn test_worst_case_covers_every_attempt_and_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.worst_case(Duration::from_secs(30)),
            Duration::from_secs(91)
        );

        let single = RetryPolicy::fixed(1, Duration::from_secs(10));
        assert_eq!(single.worst_case(Duration::from_secs(2)), Duration::from_secs(2));

        let capped = RetryPolicy::fixed(4, Duration::ZERO).with_backoff(Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_millis(350),
        });
        // 100 + 200 + 350 between four 1s attempts.
        assert_eq!(
            capped.worst_case(Duration::from_secs(1)),
            Duration::from_millis(4_650)
        );

        let huge = RetryPolicy::fixed(u32::MAX, Duration::MAX);
        assert_eq!(huge.worst_case(Duration::MAX), Duration::MAX);
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"maxAttempts": 5}"#).unwrap();
        assert_eq!(policy.attempts(), 5);
        assert_eq!(policy.delay_for(1), DEFAULT_RETRY_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_millis(500));

        let result: Result<(), String> = retry_with_policy(
            &policy,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("boom".to_string()) }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Err("boom".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_fast() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_millis(500));

        let result: Result<(), String> = retry_with_policy(
            &policy,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("fatal".to_string()) }
            },
            |_| false,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_on_later_attempt() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_millis(500));
        let started = tokio::time::Instant::now();

        let result: Result<u32, String> = retry_with_policy(
            &policy,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 2 {
                        Err("flaky".to_string())
                    } else {
                        Ok(n)
                    }
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Ok(2));
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
