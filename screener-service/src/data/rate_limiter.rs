//! Token bucket rate limiter for the provider's call budget.
//!
//! One limiter is shared by every request in the process, so concurrent
//! screenings draw from the same per-minute budget instead of each assuming
//! it owns the whole allowance.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket rate limiter.
///
/// Holds at most `capacity` tokens (one second's worth of budget, never less
/// than one) and refills continuously at `requests_per_minute / 60` per second.
#[derive(Debug)]
pub struct RateLimiter {
    /// Name for logging
    name: String,
    capacity: f64,
    requests_per_minute: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    /// Create a new rate limiter allowing `requests_per_minute` calls.
    ///
    /// ```ignore
    /// let limiter = RateLimiter::new("alpha_vantage", 5); // one call every 12s
    /// ```
    pub fn new(name: impl Into<String>, requests_per_minute: u32) -> Self {
        let rpm = f64::from(requests_per_minute.max(1));
        let capacity = (rpm / 60.0).ceil().max(1.0);

        Self {
            name: name.into(),
            capacity,
            requests_per_minute: rpm,
            refill_per_sec: rpm / 60.0,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Acquire a token, waiting until one is available.
    pub async fn acquire(&self) {
        while let Some(wait) = self.reserve() {
            debug!(
                limiter = %self.name,
                wait_ms = wait.as_millis() as u64,
                "Rate limited, waiting for token"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Take a token if one is available, otherwise report how long until
    /// the next one is.
    fn reserve(&self) -> Option<Duration> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.refill(&mut state);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            return None;
        }

        let missing = 1.0 - state.tokens;
        let wait_ms = (missing / self.refill_per_sec * 1000.0).ceil().max(1.0);
        Some(Duration::from_millis(wait_ms as u64))
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
            state.last_refill = now;
        }
    }

    /// Get current available tokens (for debugging/monitoring).
    pub fn available_tokens(&self) -> f64 {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.refill(&mut state);
        state.tokens
    }

    /// Get the configured capacity.
    pub fn capacity(&self) -> u32 {
        self.capacity as u32
    }

    /// Minimum spacing between calls once the bucket is drained.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(60.0 / self.requests_per_minute)
    }
}

/// Shared rate limiter that can be cloned.
pub type SharedRateLimiter = Arc<RateLimiter>;

/// Create a shared rate limiter.
pub fn shared_limiter(name: impl Into<String>, requests_per_minute: u32) -> SharedRateLimiter {
    Arc::new(RateLimiter::new(name, requests_per_minute))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new("test", 300);
        assert_eq!(limiter.capacity(), 5); // 300/60 = 5 req/sec

        let limiter = RateLimiter::new("test", 5);
        assert_eq!(limiter.capacity(), 1);
        assert_eq!(limiter.interval(), Duration::from_secs(12));
    }

    #[test]
    fn test_reserve_reports_wait() {
        let limiter = RateLimiter::new("test", 60); // 1 req/sec
        assert!(limiter.reserve().is_none());
        let wait = limiter.reserve().unwrap(); // no tokens left
        assert!(wait > Duration::ZERO && wait <= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_refill() {
        let limiter = RateLimiter::new("test", 5);
        let start = Instant::now();

        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(12));
        assert!(start.elapsed() < Duration::from_secs(13));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_capped_at_capacity() {
        let limiter = RateLimiter::new("test", 5);
        tokio::time::advance(Duration::from_secs(600)).await;
        assert!((limiter.available_tokens() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_budget_treated_as_one() {
        let limiter = RateLimiter::new("test", 0);
        assert_eq!(limiter.capacity(), 1);
        assert_eq!(limiter.interval(), Duration::from_secs(60));
    }
}
