//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use screener_common::config::Config;
use screener_service::data::{
    CompanyProfile, MarketData, MarketDataProvider, OutputSize, Pacing, PriceSeries,
    ProviderError, Quote,
};
use screener_service::screener::{ScreenerEngine, ShortInterestEstimator};

// ============================================================================
// Mock Provider
// ============================================================================

/// How the mock answers for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Normal,
    NoQuote,
    NoHistory,
    NoProfile,
    QuoteFails,
    HistoryFails,
    ProfileFails,
}

/// Provider with canned data, call counters and call timestamps.
pub struct MockProvider {
    behaviors: HashMap<String, Behavior>,
    pub quote_calls: AtomicU32,
    pub history_calls: AtomicU32,
    pub profile_calls: AtomicU32,
    call_times: Mutex<Vec<(String, Instant)>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            quote_calls: AtomicU32::new(0),
            history_calls: AtomicU32::new(0),
            profile_calls: AtomicU32::new(0),
            call_times: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, symbol: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(symbol.to_string(), behavior);
        self
    }

    pub fn total_calls(&self) -> u32 {
        self.quote_calls.load(Ordering::SeqCst)
            + self.history_calls.load(Ordering::SeqCst)
            + self.profile_calls.load(Ordering::SeqCst)
    }

    /// Start times of every call, in call order.
    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times
            .lock()
            .unwrap()
            .iter()
            .map(|(_, at)| *at)
            .collect()
    }

    /// `(label, start)` of every call, in call order.
    pub fn call_log(&self) -> Vec<(String, Instant)> {
        self.call_times.lock().unwrap().clone()
    }

    fn behavior(&self, symbol: &str) -> Behavior {
        self.behaviors.get(symbol).copied().unwrap_or(Behavior::Normal)
    }

    fn record(&self, label: String) {
        self.call_times.lock().unwrap().push((label, Instant::now()));
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.record(format!("quote_{}", symbol));

        match self.behavior(symbol) {
            Behavior::NoQuote => Err(ProviderError::NotFound(symbol.to_string())),
            Behavior::QuoteFails => Err(ProviderError::RateLimited(
                "Our standard API call frequency is 5 calls per minute".into(),
            )),
            _ => Ok(quote_for(symbol)),
        }
    }

    async fn daily_history(
        &self,
        symbol: &str,
        size: OutputSize,
    ) -> Result<PriceSeries, ProviderError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.record(format!("daily_{}_{}", size, symbol));

        match self.behavior(symbol) {
            Behavior::NoHistory => Err(ProviderError::NotFound(symbol.to_string())),
            Behavior::HistoryFails => Err(ProviderError::Http {
                status: 503,
                body: "unavailable".into(),
            }),
            _ => Ok(PriceSeries::new(closes())),
        }
    }

    async fn profile(&self, symbol: &str) -> Result<CompanyProfile, ProviderError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.record(format!("overview_{}", symbol));

        match self.behavior(symbol) {
            Behavior::NoProfile => Err(ProviderError::NotFound(symbol.to_string())),
            Behavior::ProfileFails => Err(ProviderError::Malformed("truncated body".into())),
            _ => Ok(profile_for(symbol)),
        }
    }
}

// ============================================================================
// Canned Data
// ============================================================================

pub fn quote_for(symbol: &str) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        price: 100.0,
        change: 2.0,
        change_percent: 2.0,
        volume: 1_250_000,
        high: 101.5,
        low: 97.25,
    }
}

/// 120 flat closes: RSI 100, both averages at 95.
pub fn closes() -> Vec<f64> {
    vec![95.0; 120]
}

pub fn profile_for(symbol: &str) -> CompanyProfile {
    CompanyProfile {
        symbol: symbol.to_string(),
        name: format!("{} Inc.", symbol),
        sector: "TECHNOLOGY".into(),
        market_cap: "3400000000".into(),
        pe_ratio: 30.0,
        dividend_yield: 0.01,
        profit_margin: 0.2,
        revenue_growth: 0.1,
        description: String::new(),
    }
}

/// Deterministic short-interest estimate.
pub struct FixedShortInterest(pub f64);

impl ShortInterestEstimator for FixedShortInterest {
    fn estimate(&self, _quote: &Quote) -> f64 {
        self.0
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub fn market_for(provider: Arc<MockProvider>, config: &Config) -> Arc<MarketData> {
    Arc::new(MarketData::new(
        provider,
        &config.cache,
        Pacing::from_config(&config.provider),
    ))
}

pub fn engine_for(provider: Arc<MockProvider>, config: &Config) -> ScreenerEngine {
    ScreenerEngine::new(market_for(provider, config), config.screener.clone())
        .with_estimator(Arc::new(FixedShortInterest(5.0)))
}
