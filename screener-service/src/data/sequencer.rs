//! Rate-limited fetch sequencer.
//!
//! Issues external calls strictly one at a time, in order. Consecutive calls
//! through the same sequencer are separated by at least the configured delay
//! (measured from the completion of the previous call), every call draws a
//! token from the process-wide [`RateLimiter`](super::RateLimiter), and every
//! call is bounded by a timeout.
//!
//! A screening request owns one sequencer; the limiter is shared by all of them.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use screener_common::config::ProviderConfig;

use super::provider::ProviderError;
use super::rate_limiter::{shared_limiter, SharedRateLimiter};

/// A deferred external call for [`FetchSequencer::sequence`].
pub type SequencedCall<'a, T> =
    Box<dyn FnOnce() -> BoxFuture<'a, Result<T, ProviderError>> + Send + 'a>;

/// Pacing policy shared by every sequencer of the process.
#[derive(Debug, Clone)]
pub struct Pacing {
    /// Minimum gap between consecutive calls of one sequencer
    pub delay: Duration,
    /// Upper bound for a single call
    pub timeout: Duration,
    /// Process-wide call budget
    pub limiter: SharedRateLimiter,
}

impl Pacing {
    pub fn new(delay: Duration, timeout: Duration, limiter: SharedRateLimiter) -> Self {
        Self {
            delay,
            timeout,
            limiter,
        }
    }

    /// Build from provider settings with a fresh limiter.
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(
            config.call_delay(),
            config.request_timeout(),
            shared_limiter("alpha_vantage", config.calls_per_minute),
        )
    }

    /// New sequencer drawing from this pacing's shared limiter.
    pub fn sequencer(&self) -> FetchSequencer {
        FetchSequencer::new(self.clone())
    }
}

/// Issues ordered, delayed calls to the external data source.
pub struct FetchSequencer {
    pacing: Pacing,
    /// Completion time of the last call; the lock is held for a whole call
    last_completed: Mutex<Option<Instant>>,
    calls: AtomicUsize,
}

impl FetchSequencer {
    pub fn new(pacing: Pacing) -> Self {
        Self {
            pacing,
            last_completed: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Run one external call in turn.
    ///
    /// Waits out the delay since the previous call (none before the first),
    /// takes a token from the shared limiter, then runs `op` under the timeout.
    pub async fn call<T, F, Fut>(&self, label: &str, op: F) -> Result<T, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut last_completed = self.last_completed.lock().await;

        if let Some(previous) = *last_completed {
            let ready_at = previous + self.pacing.delay;
            if ready_at > Instant::now() {
                debug!(
                    call = label,
                    wait_ms = ready_at.saturating_duration_since(Instant::now()).as_millis() as u64,
                    "Pacing external call"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }

        self.pacing.limiter.acquire().await;

        let index = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(call = label, index, "Issuing external call");

        let result = match tokio::time::timeout(self.pacing.timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        };

        *last_completed = Some(Instant::now());
        result
    }

    /// Run `calls` in list order, collecting one result per slot.
    ///
    /// A failed call yields an error in its slot; the remaining calls still run.
    pub async fn sequence<'a, T>(
        &self,
        calls: Vec<SequencedCall<'a, T>>,
    ) -> Vec<Result<T, ProviderError>> {
        let mut results = Vec::with_capacity(calls.len());

        for (i, call) in calls.into_iter().enumerate() {
            let label = format!("sequence[{}]", i);
            results.push(self.call(&label, call).await);
        }

        results
    }

    /// Number of external calls issued so far.
    pub fn calls_made(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn delay(&self) -> Duration {
        self.pacing.delay
    }
}

// ============================================================================
// Tests
// ============================================================================
