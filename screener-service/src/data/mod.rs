//! Market data acquisition.
//!
//! Everything that talks to the upstream provider lives here: the provider
//! trait and its Alpha Vantage adapter, the response caches, the shared
//! call budget and the per-request fetch sequencer.
//!
//! [`MarketData`] is the single gateway the rest of the service uses. Each
//! lookup checks its cache first and only goes through the sequencer (and
//! therefore pays pacing and budget) on a miss.

mod alpha_vantage;
mod cache;
mod provider;
mod rate_limiter;
mod sequencer;

pub use alpha_vantage::{AlphaVantageAdapter, HISTORY_LIMIT};
pub use cache::{CacheStats, TtlCache};
pub use provider::{MarketDataProvider, ProviderError};
pub use rate_limiter::{shared_limiter, RateLimiter, SharedRateLimiter};
pub use sequencer::{FetchSequencer, Pacing, SequencedCall};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use screener_common::config::CacheConfig;

// ============================================================================
// Core Data Types
// ============================================================================

/// Amount of daily history requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputSize {
    /// Latest ~100 sessions, enough for screening
    Compact,
    /// Full history, used by the technicals lookup
    Full,
}

impl OutputSize {
    /// Query parameter value
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Full => "full",
        }
    }
}

impl std::fmt::Display for OutputSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_param())
    }
}

/// Point-in-time quote for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    /// Percent change, e.g. `1.23` for +1.23%
    pub change_percent: f64,
    pub volume: u64,
    pub high: f64,
    pub low: f64,
}

/// Daily closing prices, most recent first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceSeries {
    closes: Vec<f64>,
}

impl PriceSeries {
    /// Wrap closes already ordered most recent first.
    pub fn new(closes: Vec<f64>) -> Self {
        Self { closes }
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    /// Most recent close.
    pub fn latest(&self) -> Option<f64> {
        self.closes.first().copied()
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}

/// Company metadata.
///
/// Numeric fields the provider leaves empty or unparseable read as 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    /// Raw market capitalization as reported, e.g. `"2950000000000"`
    pub market_cap: String,
    #[serde(rename = "pe")]
    pub pe_ratio: f64,
    pub dividend_yield: f64,
    pub profit_margin: f64,
    pub revenue_growth: f64,
    pub description: String,
}

// ============================================================================
// Market Data Gateway
// ============================================================================

/// Cache-gated, paced access to the upstream provider.
pub struct MarketData {
    provider: Arc<dyn MarketDataProvider>,
    quotes: TtlCache<Quote>,
    histories: TtlCache<PriceSeries>,
    profiles: TtlCache<CompanyProfile>,
    pacing: Pacing,
}

impl MarketData {
    pub fn new(provider: Arc<dyn MarketDataProvider>, cache: &CacheConfig, pacing: Pacing) -> Self {
        let ttl = cache.ttl();
        Self {
            provider,
            quotes: TtlCache::new("quotes", ttl, cache.max_entries),
            histories: TtlCache::new("histories", ttl, cache.max_entries),
            profiles: TtlCache::new("profiles", ttl, cache.max_entries),
            pacing,
        }
    }

    /// Fresh sequencer for one request, sharing the process-wide budget.
    pub fn sequencer(&self) -> FetchSequencer {
        self.pacing.sequencer()
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Quote for `symbol`, from cache or one paced external call.
    pub async fn quote(
        &self,
        sequencer: &FetchSequencer,
        symbol: &str,
    ) -> Result<Quote, ProviderError> {
        let key = format!("quote_{}", symbol);
        self.quotes
            .get_or_fetch(&key, || {
                sequencer.call(&key, || self.provider.quote(symbol))
            })
            .await
    }

    /// Daily closes for `symbol`, most recent first.
    pub async fn history(
        &self,
        sequencer: &FetchSequencer,
        symbol: &str,
        size: OutputSize,
    ) -> Result<PriceSeries, ProviderError> {
        let key = format!("daily_{}_{}", size, symbol);
        self.histories
            .get_or_fetch(&key, || {
                sequencer.call(&key, || self.provider.daily_history(symbol, size))
            })
            .await
    }

    /// Company profile for `symbol`.
    pub async fn profile(
        &self,
        sequencer: &FetchSequencer,
        symbol: &str,
    ) -> Result<CompanyProfile, ProviderError> {
        let key = format!("overview_{}", symbol);
        self.profiles
            .get_or_fetch(&key, || {
                sequencer.call(&key, || self.provider.profile(symbol))
            })
            .await
    }

    /// Drop expired entries from every cache. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.quotes.clear_expired() + self.histories.clear_expired() + self.profiles.clear_expired()
    }

    pub fn cache_stats(&self) -> MarketDataCacheStats {
        MarketDataCacheStats {
            quotes: self.quotes.stats(),
            histories: self.histories.stats(),
            profiles: self.profiles.stats(),
        }
    }
}

/// Per-cache statistics of a [`MarketData`] gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketDataCacheStats {
    pub quotes: CacheStats,
    pub histories: CacheStats,
    pub profiles: CacheStats,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingProvider {
        quotes: AtomicU32,
        histories: AtomicU32,
    }

    #[async_trait]
    impl MarketDataProvider for CountingProvider {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
            self.quotes.fetch_add(1, Ordering::SeqCst);
            if symbol == "MISSING" {
                return Err(ProviderError::NotFound(symbol.to_string()));
            }
            Ok(Quote {
                symbol: symbol.to_string(),
                price: 100.0,
                change: 1.0,
                change_percent: 1.0,
                volume: 1_000,
                high: 101.0,
                low: 99.0,
            })
        }

        async fn daily_history(
            &self,
            _symbol: &str,
            size: OutputSize,
        ) -> Result<PriceSeries, ProviderError> {
            self.histories.fetch_add(1, Ordering::SeqCst);
            let len = match size {
                OutputSize::Compact => 100,
                OutputSize::Full => 200,
            };
            Ok(PriceSeries::new(vec![100.0; len]))
        }

        async fn profile(&self, symbol: &str) -> Result<CompanyProfile, ProviderError> {
            Err(ProviderError::NotFound(symbol.to_string()))
        }
    }

    fn gateway(provider: Arc<CountingProvider>) -> MarketData {
        let pacing = Pacing::new(
            Duration::from_secs(13),
            Duration::from_secs(30),
            shared_limiter("test", 6000),
        );
        MarketData::new(provider, &CacheConfig::default(), pacing)
    }

    #[test]
    fn test_price_series_accessors() {
        let series = PriceSeries::new(vec![3.0, 2.0, 1.0]);
        assert_eq!(series.latest(), Some(3.0));
        assert_eq!(series.len(), 3);
        assert!(PriceSeries::default().latest().is_none());
    }

    #[test]
    fn test_output_size_param() {
        assert_eq!(OutputSize::Compact.as_param(), "compact");
        assert_eq!(OutputSize::Full.to_string(), "full");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_quote_skips_sequencer() {
        let provider = Arc::new(CountingProvider::default());
        let market = gateway(provider.clone());
        let sequencer = market.sequencer();

        market.quote(&sequencer, "AAPL").await.unwrap();
        market.quote(&sequencer, "AAPL").await.unwrap();

        assert_eq!(provider.quotes.load(Ordering::SeqCst), 1);
        assert_eq!(sequencer.calls_made(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_cached_per_output_size() {
        let provider = Arc::new(CountingProvider::default());
        let market = gateway(provider.clone());
        let sequencer = market.sequencer();

        let compact = market.history(&sequencer, "AAPL", OutputSize::Compact).await.unwrap();
        let full = market.history(&sequencer, "AAPL", OutputSize::Full).await.unwrap();

        assert_eq!(compact.len(), 100);
        assert_eq!(full.len(), 200);
        assert_eq!(provider.histories.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_not_cached() {
        let provider = Arc::new(CountingProvider::default());
        let market = gateway(provider.clone());
        let sequencer = market.sequencer();

        for _ in 0..2 {
            let err = market.quote(&sequencer, "MISSING").await.unwrap_err();
            assert!(err.is_not_found());
        }

        assert_eq!(provider.quotes.load(Ordering::SeqCst), 2);
        assert_eq!(market.cache_stats().quotes.total_entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_expired_entries() {
        let provider = Arc::new(CountingProvider::default());
        let market = gateway(provider);
        let sequencer = market.sequencer();

        market.quote(&sequencer, "AAPL").await.unwrap();
        market.history(&sequencer, "AAPL", OutputSize::Compact).await.unwrap();

        tokio::time::advance(CacheConfig::default().ttl()).await;
        assert_eq!(market.sweep(), 2);
        assert_eq!(market.cache_stats().histories.total_entries, 0);
    }
}
