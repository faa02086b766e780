//! Stock Screener Service
//!
//! Screens US equities against Alpha Vantage market data under the free
//! tier's call budget (5 calls/minute).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  stock-screener (Rust Service)                      │
//! │                           :3000                                     │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐     │
//! │  │  Market Data    │  │  Indicators     │  │  Screener       │     │
//! │  │  cache + pacing │  │  RSI / MA dist  │  │  filter + plan  │     │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Call Budget
//!
//! - One token bucket per process, shared by every request
//! - One sequencer per request: calls strictly in order, spaced by the
//!   configured delay (13s by default)
//! - Cache hits cost neither a call nor a delay

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod indicators;
pub mod routes;
pub mod screener;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use screener_common::config::Config;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::data::{AlphaVantageAdapter, MarketData, MarketDataProvider, Pacing};
use crate::screener::ScreenerEngine;

/// Screener service state
pub struct ScreenerState {
    /// Configuration
    pub config: Config,
    /// Cache-gated market data gateway
    pub market: Arc<MarketData>,
    /// Screening orchestrator
    pub engine: Arc<ScreenerEngine>,
}

impl ScreenerState {
    /// Create state backed by Alpha Vantage.
    pub fn new(config: Config) -> Result<Self> {
        let provider = AlphaVantageAdapter::from_config(&config)
            .context("Alpha Vantage API key not configured (set ALPHA_VANTAGE_API_KEY)")?;
        Ok(Self::with_provider(config, Arc::new(provider)))
    }

    /// Create state backed by any provider.
    pub fn with_provider(config: Config, provider: Arc<dyn MarketDataProvider>) -> Self {
        let pacing = Pacing::from_config(&config.provider);
        let market = Arc::new(MarketData::new(provider, &config.cache, pacing));
        let engine = Arc::new(ScreenerEngine::new(
            Arc::clone(&market),
            config.screener.clone(),
        ));

        Self {
            config,
            market,
            engine,
        }
    }
}

/// Build the HTTP router with permissive CORS.
pub fn build_router(state: Arc<ScreenerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/quote/:symbol", get(routes::get_quote))
        .route("/api/technicals/:symbol", get(routes::get_technicals))
        .route("/api/overview/:symbol", get(routes::get_overview))
        .route("/api/screen", post(routes::screen))
        .layer(cors)
        .with_state(state)
}

/// Main screener service
pub struct ScreenerService {
    state: Arc<ScreenerState>,
}

impl ScreenerService {
    /// Create a new screener service
    pub fn new(config: Config) -> Result<Self> {
        let state = Arc::new(ScreenerState::new(config)?);
        Ok(Self { state })
    }

    pub fn state(&self) -> &Arc<ScreenerState> {
        &self.state
    }

    /// Start the screener service
    pub async fn start(self) -> Result<()> {
        let app = build_router(self.state.clone());

        // Start the cache sweeper
        let sweep_state = self.state.clone();
        let sweep_secs = self.state.config.cache.sweep_interval_secs.max(1);
        let sweep_interval = Duration::from_secs(sweep_secs);
        tokio::spawn(async move {
            run_cache_sweeper(sweep_state, sweep_interval).await;
        });

        // Start HTTP server
        let addr: SocketAddr = self
            .state
            .config
            .bind_address()
            .parse()
            .context("Invalid bind address")?;
        tracing::info!(address = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

/// Periodically drop expired cache entries.
async fn run_cache_sweeper(state: Arc<ScreenerState>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let removed = state.market.sweep();
        if removed > 0 {
            tracing::debug!(removed, "Swept expired cache entries");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
