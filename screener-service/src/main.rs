//! Stock Screener - rate-limited screening service over Alpha Vantage data.
//!
//! Serves single-symbol lookups and batch screens while keeping every
//! upstream call inside the provider's per-minute budget.

use anyhow::{Context, Result};
use screener_common::config::Config;
use screener_common::logging::init_logging_with_exclusions;
use screener_service::ScreenerService;

#[tokio::main]
async fn main() -> Result<()> {
    // Start timing immediately for cold-start measurement
    let startup_start = std::time::Instant::now();

    // Load configuration (file, then environment overrides)
    let config = Config::load_with_env()?;
    config.validate().context("Invalid configuration")?;

    // Initialize logging
    init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    tracing::info!("Stock Screener v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        calls_per_minute = config.provider.calls_per_minute,
        call_delay_ms = config.provider.call_delay().as_millis() as u64,
        batch_size = config.screener.batch_size,
        cache_ttl_secs = config.cache.ttl_secs,
        "Call budget configured"
    );

    let service = ScreenerService::new(config)?;

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    service.start().await
}
