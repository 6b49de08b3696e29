//! Shared rate limiter for gateway tool invocations.
//!
//! Every tool call (validation, execution and schema exploration alike) is
//! admitted through a single [`RateLimiter`] before any work happens.
//!
//! # Rate Limit Algorithm
//!
//! Classic token bucket:
//! - The bucket holds up to `requests_per_minute` tokens and starts full
//! - Tokens refill continuously at `requests_per_minute / 60` per second
//! - Each admitted call consumes one token; callers are throttled, not queued
//!
//! A non-positive `requests_per_minute` disables limiting entirely.
//!
//! # Persistence
//!
//! State is in-memory only and resets on process restart.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Value returned by [`RateLimiter::tokens_available`] in unlimited mode.
pub const UNLIMITED_TOKENS: f64 = -1.0;

/// Source of monotonic time for the limiter.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Mutable bucket state. Only touched under the limiter's mutex.
#[derive(Debug, Clone)]
pub struct RateLimiterState {
    pub tokens: f64,
    pub max_tokens: f64,
    pub refill_rate_per_sec: f64,
    pub last_refill: Instant,
}

impl RateLimiterState {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate_per_sec).min(self.max_tokens);
        self.last_refill = now;
    }

    fn wait_time(&self) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.refill_rate_per_sec)
        }
    }
}

/// Token-bucket admission control, safe to share via `Arc`.
///
/// The limiter never blocks or sleeps; it only answers whether a call may
/// proceed and how long until one could.
pub struct RateLimiter {
    /// `None` in unlimited mode.
    state: Option<Mutex<RateLimiterState>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter using wall-clock time.
    pub fn new(requests_per_minute: i64) -> Self {
        Self::with_clock(requests_per_minute, Arc::new(SystemClock))
    }

    /// Create a limiter that reads time from `clock`.
    pub fn with_clock(requests_per_minute: i64, clock: Arc<dyn Clock>) -> Self {
        let state = (requests_per_minute > 0).then(|| {
            let max_tokens = requests_per_minute as f64;
            Mutex::new(RateLimiterState {
                tokens: max_tokens,
                max_tokens,
                refill_rate_per_sec: max_tokens / 60.0,
                last_refill: clock.now(),
            })
        });

        Self { state, clock }
    }

    /// A limiter that admits everything.
    pub fn unlimited() -> Self {
        Self::new(0)
    }

    pub fn is_unlimited(&self) -> bool {
        self.state.is_none()
    }

    /// Run `f` against the refilled state inside the critical section.
    fn with_state<T>(&self, f: impl FnOnce(&mut RateLimiterState) -> T) -> Option<T> {
        let state = self.state.as_ref()?;
        // A poisoned lock still holds consistent numbers; every mutation is a
        // plain assignment.
        let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
        guard.refill(self.clock.now());
        Some(f(&mut guard))
    }

    /// Consume a token if one is available.
    pub fn allow(&self) -> bool {
        self.with_state(|s| {
            if s.tokens >= 1.0 {
                s.tokens -= 1.0;
                true
            } else {
                false
            }
        })
        .unwrap_or(true)
    }

    /// Tokens currently in the bucket, or [`UNLIMITED_TOKENS`].
    pub fn tokens_available(&self) -> f64 {
        self.with_state(|s| s.tokens).unwrap_or(UNLIMITED_TOKENS)
    }

    /// Time until at least one token is available.
    pub fn wait_time(&self) -> Duration {
        self.with_state(|s| s.wait_time()).unwrap_or(Duration::ZERO)
    }

    /// Admit a call, or report how long to back off.
    pub fn check(&self) -> Result<(), RateLimitError> {
        self.with_state(|s| {
            if s.tokens >= 1.0 {
                s.tokens -= 1.0;
                Ok(())
            } else {
                Err(RateLimitError {
                    retry_after: s.wait_time(),
                })
            }
        })
        .unwrap_or(Ok(()))
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("unlimited", &self.is_unlimited())
            .finish()
    }
}

/// Error when rate limited.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Rate limited, retry after {retry_after:?}")]
pub struct RateLimitError {
    pub retry_after: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualClock;

    fn limiter(rpm: i64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (RateLimiter::with_clock(rpm, clock.clone()), clock)
    }

    #[test]
    fn test_unlimited_always_allows() {
        for rpm in [0, -1, -60] {
            let limiter = RateLimiter::new(rpm);
            assert!(limiter.is_unlimited());
            for _ in 0..1000 {
                assert!(limiter.allow());
            }
            assert!(limiter.tokens_available() < 0.0);
            assert_eq!(limiter.wait_time(), Duration::ZERO);
            assert!(limiter.check().is_ok());
        }
    }

    #[test]
    fn test_full_bucket_drains_then_refuses() {
        let (limiter, _clock) = limiter(60);

        let mut admitted = 0;
        while limiter.allow() {
            admitted += 1;
            assert!(admitted <= 61, "bucket never emptied");
        }

        assert_eq!(admitted, 60);
        assert!(!limiter.allow());
    }

    #[test]
    fn test_refills_about_one_token_per_second() {
        let (limiter, clock) = limiter(60);
        while limiter.allow() {}

        clock.advance(Duration::from_millis(1100));

        assert!(limiter.allow());
        assert!(!limiter.allow());
    }

    #[test]
    fn test_tokens_capped_at_max() {
        let (limiter, clock) = limiter(30);
        assert!(limiter.allow());

        clock.advance(Duration::from_secs(3600));

        assert_eq!(limiter.tokens_available(), 30.0);
    }

    #[test]
    fn test_wait_time() {
        let (limiter, clock) = limiter(60);
        assert_eq!(limiter.wait_time(), Duration::ZERO);

        while limiter.allow() {}
        let wait = limiter.wait_time();
        assert!(wait > Duration::from_millis(900) && wait <= Duration::from_secs(1));

        clock.advance(Duration::from_millis(500));
        let wait = limiter.wait_time();
        assert!(wait > Duration::from_millis(400) && wait <= Duration::from_millis(500));
    }

    #[test]
    fn test_check_reports_retry_after() {
        let (limiter, _clock) = limiter(1);
        assert!(limiter.check().is_ok());

        let err = limiter.check().unwrap_err();
        assert!(err.retry_after > Duration::from_secs(59));
        assert!(err.to_string().contains("retry after"));
    }

    #[test]
    fn test_concurrent_admission_never_oversubscribes() {
        let (limiter, _clock) = limiter(100);
        let limiter = Arc::new(limiter);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || (0..50).filter(|_| limiter.allow()).count())
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 100);
        assert!(limiter.tokens_available() >= 0.0);
    }
}
