//! Alpha Vantage API adapter for US equities.
//!
//! # API Documentation
//! <https://www.alphavantage.co/documentation/>
//!
//! # Functions used
//! - `GLOBAL_QUOTE`: latest quote
//! - `TIME_SERIES_DAILY`: daily OHLCV (`compact` = 100 sessions, `full` = 20+ years)
//! - `OVERVIEW`: company fundamentals
//!
//! # Rate Limits
//! - Free tier: 5 requests/minute
//! - Throttled calls still answer HTTP 200, with a `Note` or `Information`
//!   field instead of data
//!
//! Pacing is not done here: every call goes through the
//! [`FetchSequencer`](super::FetchSequencer) owned by the caller.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use screener_common::config::Config;
use screener_common::util::sanitize_for_log;

use super::provider::{MarketDataProvider, ProviderError};
use super::{CompanyProfile, OutputSize, PriceSeries, Quote};

// ============================================================================
// Constants
// ============================================================================

/// Alpha Vantage query endpoint
const ALPHA_VANTAGE_API_BASE: &str = "https://www.alphavantage.co/query";

/// Closes kept from a daily series (enough for the 200-day average)
pub const HISTORY_LIMIT: usize = 200;

const QUOTE_FUNCTION: &str = "GLOBAL_QUOTE";
const DAILY_FUNCTION: &str = "TIME_SERIES_DAILY";
const OVERVIEW_FUNCTION: &str = "OVERVIEW";

// ============================================================================
// Alpha Vantage Adapter
// ============================================================================

/// Alpha Vantage adapter.
///
/// One method call is exactly one HTTP request.
pub struct AlphaVantageAdapter {
    /// API key
    api_key: String,
    /// Query endpoint (overridable for tests)
    base_url: String,
    /// HTTP client
    client: reqwest::Client,
}

impl AlphaVantageAdapter {
    /// Create a new adapter against the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, ALPHA_VANTAGE_API_BASE, Duration::from_secs(30))
    }

    /// Create with a custom endpoint and transport timeout.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client,
        }
    }

    /// Create from config. `None` when no API key is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        let api_key = config.alpha_vantage_api_key()?;
        Some(Self::with_base_url(
            api_key,
            config.provider.base_url.clone(),
            config.provider.request_timeout(),
        ))
    }

    /// Issue one query and return the JSON body, with the provider's
    /// in-band error fields already mapped to [`ProviderError`].
    async fn query(
        &self,
        function: &str,
        symbol: &str,
        extra: &[(&str, &str)],
    ) -> Result<serde_json::Value, ProviderError> {
        let mut params: Vec<(&str, &str)> = vec![
            ("function", function),
            ("symbol", symbol),
            ("apikey", self.api_key.as_str()),
        ];
        params.extend_from_slice(extra);

        let request = self
            .client
            .get(&self.base_url)
            .header("accept", "application/json")
            .query(&params)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        debug!(
            url = %sanitize_for_log(request.url().as_str()),
            symbol = symbol,
            function = function,
            "Fetching from Alpha Vantage"
        );

        let response = self.client.execute(request).await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else if e.is_connect() {
                ProviderError::Network("Connection failed".into())
            } else {
                ProviderError::Network(sanitize_for_log(&e.to_string()))
            }
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited("HTTP 429".into()));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::Auth(format!("HTTP {}", status.as_u16())));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to read body: {}", e)))?;

        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Malformed(format!("Invalid JSON: {}", e)))?;

        check_in_band_error(symbol, &value)?;
        Ok(value)
    }
}

/// Alpha Vantage reports throttling and bad symbols inside a 200 response.
fn check_in_band_error(symbol: &str, value: &serde_json::Value) -> Result<(), ProviderError> {
    if let Some(msg) = value.get("Error Message").and_then(|v| v.as_str()) {
        debug!(symbol = symbol, message = msg, "Alpha Vantage rejected symbol");
        return Err(ProviderError::NotFound(symbol.to_string()));
    }

    for field in ["Note", "Information"] {
        if let Some(msg) = value.get(field).and_then(|v| v.as_str()) {
            return Err(ProviderError::RateLimited(msg.to_string()));
        }
    }

    Ok(())
}

// ============================================================================
// Payload Parsing
// ============================================================================

fn parse_quote(symbol: &str, value: serde_json::Value) -> Result<Quote, ProviderError> {
    let envelope: GlobalQuoteEnvelope = serde_json::from_value(value)
        .map_err(|e| ProviderError::Malformed(format!("Unexpected quote payload: {}", e)))?;

    let fields = envelope
        .quote
        .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))?;

    let raw_price = fields
        .price
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))?;

    let price = parse_number(raw_price)
        .ok_or_else(|| ProviderError::Malformed(format!("Invalid price: {}", raw_price)))?;

    let change_percent = fields
        .change_percent
        .as_deref()
        .map(|p| p.trim_end_matches('%'))
        .and_then(parse_number)
        .unwrap_or(0.0);

    Ok(Quote {
        symbol: symbol.to_string(),
        price,
        change: number_or_zero(fields.change.as_deref()),
        change_percent,
        volume: fields
            .volume
            .as_deref()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0),
        high: number_or_zero(fields.high.as_deref()),
        low: number_or_zero(fields.low.as_deref()),
    })
}

fn parse_daily(symbol: &str, value: serde_json::Value) -> Result<PriceSeries, ProviderError> {
    let envelope: DailySeriesEnvelope = serde_json::from_value(value)
        .map_err(|e| ProviderError::Malformed(format!("Unexpected series payload: {}", e)))?;

    let series = envelope
        .series
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))?;

    // ISO dates order lexically; newest last in the map
    let closes = series
        .iter()
        .rev()
        .take(HISTORY_LIMIT)
        .map(|(date, bar)| {
            parse_number(&bar.close).ok_or_else(|| {
                ProviderError::Malformed(format!("Invalid close on {}: {}", date, bar.close))
            })
        })
        .collect::<Result<Vec<f64>, ProviderError>>()?;

    Ok(PriceSeries::new(closes))
}

fn parse_overview(symbol: &str, value: serde_json::Value) -> Result<CompanyProfile, ProviderError> {
    let overview: OverviewPayload = serde_json::from_value(value)
        .map_err(|e| ProviderError::Malformed(format!("Unexpected overview payload: {}", e)))?;

    let reported_symbol = overview
        .symbol
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))?;

    Ok(CompanyProfile {
        symbol: reported_symbol,
        name: overview.name.unwrap_or_default(),
        sector: overview.sector.unwrap_or_default(),
        market_cap: overview.market_cap.unwrap_or_default(),
        pe_ratio: number_or_zero(overview.pe_ratio.as_deref()),
        dividend_yield: number_or_zero(overview.dividend_yield.as_deref()),
        profit_margin: number_or_zero(overview.profit_margin.as_deref()),
        revenue_growth: number_or_zero(overview.revenue_growth.as_deref()),
        description: overview.description.unwrap_or_default(),
    })
}

/// Finite decimal, or `None` (Alpha Vantage uses `"None"` and `"-"` for gaps).
fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn number_or_zero(raw: Option<&str>) -> f64 {
    raw.and_then(parse_number).unwrap_or(0.0)
}

// ============================================================================
// MarketDataProvider Implementation
// ============================================================================

#[async_trait]
impl MarketDataProvider for AlphaVantageAdapter {
    fn name(&self) -> &'static str {
        "alpha_vantage"
    }

    async fn quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        let value = self.query(QUOTE_FUNCTION, symbol, &[]).await?;
        parse_quote(symbol, value)
    }

    async fn daily_history(
        &self,
        symbol: &str,
        size: OutputSize,
    ) -> Result<PriceSeries, ProviderError> {
        let value = self
            .query(DAILY_FUNCTION, symbol, &[("outputsize", size.as_param())])
            .await?;
        parse_daily(symbol, value)
    }

    async fn profile(&self, symbol: &str) -> Result<CompanyProfile, ProviderError> {
        let value = self.query(OVERVIEW_FUNCTION, symbol, &[]).await?;
        parse_overview(symbol, value)
    }
}

// ============================================================================
// API Response Types
// ============================================================================

/// `GLOBAL_QUOTE` response wrapper
#[derive(Debug, Deserialize)]
struct GlobalQuoteEnvelope {
    #[serde(rename = "Global Quote", default)]
    quote: Option<GlobalQuoteFields>,
}

/// Quote fields; every value is a string on the wire
#[derive(Debug, Default, Deserialize)]
struct GlobalQuoteFields {
    #[serde(rename = "03. high", default)]
    high: Option<String>,
    #[serde(rename = "04. low", default)]
    low: Option<String>,
    #[serde(rename = "05. price", default)]
    price: Option<String>,
    #[serde(rename = "06. volume", default)]
    volume: Option<String>,
    #[serde(rename = "09. change", default)]
    change: Option<String>,
    /// e.g. `"1.2345%"`
    #[serde(rename = "10. change percent", default)]
    change_percent: Option<String>,
}

/// `TIME_SERIES_DAILY` response wrapper, keyed by `YYYY-MM-DD`
#[derive(Debug, Deserialize)]
struct DailySeriesEnvelope {
    #[serde(rename = "Time Series (Daily)", default)]
    series: Option<BTreeMap<String, DailyBar>>,
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "4. close")]
    close: String,
}

/// `OVERVIEW` response (flat object)
#[derive(Debug, Deserialize)]
struct OverviewPayload {
    #[serde(rename = "Symbol", default)]
    symbol: Option<String>,
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "Sector", default)]
    sector: Option<String>,
    #[serde(rename = "MarketCapitalization", default)]
    market_cap: Option<String>,
    #[serde(rename = "PERatio", default)]
    pe_ratio: Option<String>,
    #[serde(rename = "DividendYield", default)]
    dividend_yield: Option<String>,
    #[serde(rename = "ProfitMargin", default)]
    profit_margin: Option<String>,
    #[serde(rename = "QuarterlyRevenueGrowthYOY", default)]
    revenue_growth: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================
