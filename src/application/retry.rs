//! Bounded retry with exponential backoff.
//!
//! Content-store puts and ledger appends sit inside a multi-step operation
//! with no rollback, so no call is ever retried indefinitely: the attempt
//! count and backoff are configuration inputs, and after the bound is
//! exhausted the last error is surfaced to the caller verbatim.

use std::time::Duration;

/// Retry configuration for transient external failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1)
    pub max_attempts: u32,

    /// Sleep before the second attempt; doubles per attempt
    pub base_backoff: Duration,

    /// Cap on the per-attempt sleep
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Run `op`, retrying while `retryable` holds and attempts remain.
    ///
    /// # Errors
    /// Returns the last error once a non-retryable failure occurs or the
    /// attempt bound is exhausted.
    pub fn run<T, E, Op, Rt>(&self, what: &str, retryable: Rt, mut op: Op) -> Result<T, E>
    where
        E: std::fmt::Display,
        Op: FnMut() -> Result<T, E>,
        Rt: Fn(&E) -> bool,
    {
        let attempts = self.max_attempts.max(1);
        let mut backoff = self.base_backoff;

        for attempt in 1..=attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if retryable(&e) && attempt < attempts => {
                    tracing::warn!(
                        operation = what,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Transient failure, backing off before retry"
                    );
                    std::thread::sleep(backoff);
                    backoff = (backoff * 2).min(self.max_backoff);
                }
                Err(e) => return Err(e),
            }
        }
        unreachable!("loop returns on the final attempt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_succeeds_first_try() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = policy.run("op", |_| true, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        });
        assert_eq!(result.expect("Should succeed"), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retries_transient_then_succeeds() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        };
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = policy.run("op", |_| true, || {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err("flaky".to_string())
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.expect("Should succeed"), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_bound_exhausted_surfaces_last_error() {
        let policy = RetryPolicy {
            max_attempts: 2,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
        };
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = policy.run("op", |_| true, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("still down".to_string())
        });
        assert_eq!(result.expect_err("Should fail"), "still down");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fatal_error_not_retried() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = policy.run("op", |e: &String| e.as_str() == "transient", || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("fatal".to_string())
        });
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
