// src/ingest/retry.rs
//! One retry policy for every remote call: fetch service, store, webhooks.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// `base`, `2*base`, `4*base`, ... capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Pause after the `attempt`-th failure (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(d) => d,
            Backoff::Exponential { base, max } => {
                let shift = attempt.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << shift).min(max)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Backoff::Fixed(Duration::from_secs(2)))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Single attempt, no pause.
    pub fn none() -> Self {
        Self::new(1, Backoff::Fixed(Duration::ZERO))
    }

    /// Run `op` until it succeeds, returns a non-retryable error, or attempts run out.
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut, P>(&self, label: &str, mut op: F, retryable: P) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if attempt >= self.max_attempts || !retryable(&e) {
                        return Err(e);
                    }
                    let pause = self.backoff.delay(attempt);
                    tracing::debug!(
                        target: "ingest",
                        op = label,
                        attempt,
                        pause_ms = pause.as_millis() as u64,
                        error = %e,
                        "retrying"
                    );
                    if !pause.is_zero() {
                        tokio::time::sleep(pause).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn exponential_doubles_and_caps() {
        let b = Backoff::Exponential {
            base: Duration::from_millis(500),
            max: Duration::from_secs(3),
        };
        assert_eq!(b.delay(1), Duration::from_millis(500));
        assert_eq!(b.delay(2), Duration::from_millis(1000));
        assert_eq!(b.delay(3), Duration::from_millis(2000));
        assert_eq!(b.delay(4), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn stops_on_non_retryable() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let p = RetryPolicy::new(5, Backoff::Fixed(Duration::ZERO));
        let r: Result<(), String> = p
            .run(
                "t",
                move |_| async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("fatal".to_string())
                },
                |e: &String| e != "fatal",
            )
            .await;
        assert!(r.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let p = RetryPolicy::new(3, Backoff::Fixed(Duration::ZERO));
        let r: Result<u32, String> = p
            .run(
                "t",
                |attempt| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt < 3 {
                            Err("flaky".to_string())
                        } else {
                            Ok(attempt)
                        }
                    }
                },
                |_| true,
            )
            .await;
        assert_eq!(r, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
