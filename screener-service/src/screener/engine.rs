//! Screening orchestrator.
//!
//! Turns a screen request into a [`ScreenReport`]: resolves the candidate
//! symbols, fetches quote, history and profile for each one through a single
//! per-request sequencer, derives indicators, applies the filters and
//! assembles the accepted records.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use screener_common::config::ScreenerConfig;
use screener_common::util::round_to;

use crate::data::{
    CompanyProfile, FetchSequencer, MarketData, OutputSize, ProviderError, Quote,
};
use crate::indicators::IndicatorSet;

use super::catalog::{self, ScreenType};
use super::filter::{evaluate, CandidateMetrics, FilterRejection, FilterSpec};
use super::report::{batch_note, CandidateRecord, ScreenReport, SkippedSymbol};

// ============================================================================
// Request & Errors
// ============================================================================

/// A screening request as posted by clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenRequest {
    /// `"swing"` or `"growth"`
    #[serde(rename = "type")]
    pub screen_type: String,
    #[serde(default)]
    pub filters: FilterSpec,
}

impl ScreenRequest {
    pub fn new(screen_type: impl Into<String>, filters: FilterSpec) -> Self {
        Self {
            screen_type: screen_type.into(),
            filters,
        }
    }
}

/// Request-level failure, as opposed to an empty result.
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("Invalid screening request: {0}")]
    InvalidRequest(String),
    #[error("Screening failed: {0}")]
    Internal(String),
}

impl From<ScreenError> for screener_common::Error {
    fn from(err: ScreenError) -> Self {
        match err {
            ScreenError::InvalidRequest(msg) => Self::InvalidInput(msg),
            ScreenError::Internal(msg) => Self::Internal(msg),
        }
    }
}

/// Upstream lookup a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Quote,
    History,
    Profile,
}

impl std::fmt::Display for FetchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quote => write!(f, "quote"),
            Self::History => write!(f, "history"),
            Self::Profile => write!(f, "profile"),
        }
    }
}

/// Why a symbol is absent from the result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("no quote available")]
    NoQuote,
    #[error("{stage} fetch failed: {source}")]
    Fetch {
        stage: FetchStage,
        source: ProviderError,
    },
    #[error("filtered out: {0}")]
    Rejected(#[from] FilterRejection),
}

// ============================================================================
// Short Interest Estimate
// ============================================================================

/// Source of the short-interest figure.
///
/// The provider does not publish short interest, so the default is a
/// placeholder derived from the day's move.
pub trait ShortInterestEstimator: Send + Sync {
    fn estimate(&self, quote: &Quote) -> f64;
}

/// `uniform[0, 15) + |change %|`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomShortInterest;

impl ShortInterestEstimator for RandomShortInterest {
    fn estimate(&self, quote: &Quote) -> f64 {
        rand::thread_rng().gen_range(0.0..15.0) + quote.change_percent.abs()
    }
}

// ============================================================================
// Screener Engine
// ============================================================================

/// The screening orchestrator.
///
/// Symbols are processed strictly one after another; every external call of
/// a request goes through the same [`FetchSequencer`].
pub struct ScreenerEngine {
    market: Arc<MarketData>,
    config: ScreenerConfig,
    short_interest: Arc<dyn ShortInterestEstimator>,
}

impl ScreenerEngine {
    /// Create a new screener engine with the placeholder short-interest estimate.
    pub fn new(market: Arc<MarketData>, config: ScreenerConfig) -> Self {
        Self {
            market,
            config,
            short_interest: Arc::new(RandomShortInterest),
        }
    }

    /// Replace the short-interest estimator.
    pub fn with_estimator(mut self, estimator: Arc<dyn ShortInterestEstimator>) -> Self {
        self.short_interest = estimator;
        self
    }

    /// Run one screen.
    pub async fn screen(&self, request: &ScreenRequest) -> Result<ScreenReport, ScreenError> {
        let screen_type: ScreenType = request
            .screen_type
            .parse()
            .map_err(ScreenError::InvalidRequest)?;

        let (category, symbols) = self.select_symbols(screen_type, &request.filters);
        if symbols.is_empty() {
            return Err(ScreenError::Internal(format!(
                "No symbols configured for {} / {}",
                screen_type, category
            )));
        }

        let started_at = Utc::now();
        let id = format!("screen_{}", started_at.format("%Y%m%d_%H%M%S"));

        info!(
            screen_id = %id,
            screen_type = %screen_type,
            category,
            symbols = ?symbols,
            "Starting screen"
        );

        let sequencer = self.market.sequencer();
        let mut stocks = Vec::with_capacity(symbols.len());
        let mut skipped = Vec::new();

        for symbol in &symbols {
            match self.screen_symbol(&sequencer, symbol, &request.filters).await {
                Ok(record) => {
                    debug!(symbol = %symbol, "Symbol accepted");
                    stocks.push(record);
                }
                Err(reason) => {
                    match &reason {
                        SkipReason::Rejected(_) => {
                            info!(symbol = %symbol, reason = %reason, "Symbol filtered out")
                        }
                        _ => warn!(symbol = %symbol, reason = %reason, "Symbol skipped"),
                    }
                    skipped.push(SkippedSymbol::new(symbol.as_str(), &reason));
                }
            }
        }

        let report = ScreenReport {
            id,
            category: category.to_string(),
            stocks,
            skipped,
            note: batch_note(self.config.batch_size),
            external_calls: sequencer.calls_made(),
            started_at,
            completed_at: Utc::now(),
        };

        info!(screen_id = %report.id, calls = report.external_calls, "{}", report.summary());

        Ok(report)
    }

    /// Candidate symbols for a screen: catalog list, de-duplicated in order,
    /// truncated to the batch size.
    pub fn select_symbols(
        &self,
        screen_type: ScreenType,
        filters: &FilterSpec,
    ) -> (&'static str, Vec<String>) {
        let requested = match screen_type {
            ScreenType::Swing => filters.sector.as_deref(),
            ScreenType::Growth => filters.growth_sector.as_deref(),
        };

        let (category, listed) = catalog::resolve(screen_type, requested);
        if let Some(requested) = requested.filter(|r| !r.trim().is_empty()) {
            if !requested.trim().eq_ignore_ascii_case(category) {
                warn!(requested, fallback = category, "Unknown category, using default");
            }
        }

        let mut seen = HashSet::new();
        let symbols = listed
            .iter()
            .filter(|s| seen.insert(**s))
            .take(self.config.batch_size)
            .map(|s| s.to_string())
            .collect();

        (category, symbols)
    }

    /// Quote, then history, then profile, then filters.
    async fn screen_symbol(
        &self,
        sequencer: &FetchSequencer,
        symbol: &str,
        filters: &FilterSpec,
    ) -> Result<CandidateRecord, SkipReason> {
        let quote = match self.market.quote(sequencer, symbol).await {
            Ok(quote) => quote,
            Err(e) if e.is_not_found() => return Err(SkipReason::NoQuote),
            Err(e) => {
                return Err(SkipReason::Fetch {
                    stage: FetchStage::Quote,
                    source: e,
                })
            }
        };

        let indicators = match self
            .market
            .history(sequencer, symbol, OutputSize::Compact)
            .await
        {
            Ok(series) => {
                IndicatorSet::compute(quote.price, &series, self.config.moving_average_mode)
            }
            Err(e) if e.is_not_found() => {
                debug!(symbol, "No daily history, indicators unavailable");
                IndicatorSet::unavailable()
            }
            Err(e) => {
                return Err(SkipReason::Fetch {
                    stage: FetchStage::History,
                    source: e,
                })
            }
        };

        let profile: Option<CompanyProfile> = match self.market.profile(sequencer, symbol).await {
            Ok(profile) => Some(profile),
            Err(e) if e.is_not_found() => {
                debug!(symbol, "No company profile, using placeholders");
                None
            }
            Err(e) => {
                return Err(SkipReason::Fetch {
                    stage: FetchStage::Profile,
                    source: e,
                })
            }
        };

        let short_interest = profile
            .as_ref()
            .map(|_| round_to(self.short_interest.estimate(&quote), 2));

        evaluate(
            filters,
            &CandidateMetrics::new(quote.price, &indicators, short_interest),
        )?;

        Ok(CandidateRecord::assemble(
            &quote,
            profile.as_ref(),
            &indicators,
            short_interest,
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================
