//! Stock screener.
//!
//! Scans a short list of US equities against user filters under a strict
//! upstream call budget.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌───────────────┐
//! │   Catalog    │───▶│    Engine    │───▶│    Report     │
//! │ (type/sector)│    │ (per symbol) │    │ (stocks/skip) │
//! └──────────────┘    └──────┬───────┘    └───────────────┘
//!                            │
//!          ┌─────────────────┼──────────────────┐
//!          ▼                 ▼                  ▼
//!   ┌─────────────┐   ┌─────────────┐    ┌─────────────┐
//!   │ MarketData  │   │ Indicators  │    │   Filter    │
//!   │ cache + seq │   │  RSI / MA   │    │  evaluator  │
//!   └─────────────┘   └─────────────┘    └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use screener_service::screener::{ScreenerEngine, ScreenRequest, FilterSpec};
//!
//! let engine = ScreenerEngine::new(market, config.screener.clone());
//! let report = engine.screen(&ScreenRequest::new("swing", FilterSpec::default())).await?;
//! ```

pub mod catalog;
pub mod engine;
pub mod filter;
pub mod report;

pub use catalog::ScreenType;
pub use engine::{
    FetchStage, RandomShortInterest, ScreenError, ScreenRequest, ScreenerEngine,
    ShortInterestEstimator, SkipReason,
};
pub use filter::{evaluate, passes, CandidateMetrics, FilterRejection, FilterSpec, Ma50Position};
pub use report::{format_market_cap, CandidateRecord, ScreenReport, SkippedSymbol};
