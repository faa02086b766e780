//! Data provider abstraction for upstream market data.
//!
//! Defines the `MarketDataProvider` trait the screening pipeline consumes:
//! a quote lookup, a daily-history lookup and a company-profile lookup.

use async_trait::async_trait;
use std::fmt;

use super::{CompanyProfile, OutputSize, PriceSeries, Quote};

// ============================================================================
// Provider Error
// ============================================================================

/// Errors specific to data providers.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The provider answered but has no data for the symbol
    NotFound(String),
    /// Network error (connection failed, DNS, reset)
    Network(String),
    /// Non-success HTTP status
    Http { status: u16, body: String },
    /// Rate limit exceeded (HTTP 429 or the provider's throttling notice)
    RateLimited(String),
    /// Authentication error (invalid or missing API key)
    Auth(String),
    /// Payload could not be interpreted
    Malformed(String),
    /// The call did not complete within the configured timeout
    Timeout,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "Not found: {}", what),
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Http { status, body } => {
                write!(f, "HTTP {}", status)?;
                if !body.is_empty() {
                    write!(f, ": {}", body)?;
                }
                Ok(())
            }
            Self::RateLimited(msg) => write!(f, "Rate limited: {}", msg),
            Self::Auth(msg) => write!(f, "Authentication error: {}", msg),
            Self::Malformed(msg) => write!(f, "Malformed payload: {}", msg),
            Self::Timeout => write!(f, "Request timed out"),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// The "not found" sentinel, as opposed to a transport/provider failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<ProviderError> for screener_common::Error {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(what) => Self::NotFound(what),
            other => Self::External(other.to_string()),
        }
    }
}

// ============================================================================
// Market Data Provider Trait
// ============================================================================

/// Trait for upstream market data providers.
///
/// Implementations perform exactly one external call per method invocation;
/// pacing and caching are layered on top by [`super::MarketData`].
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider name for logging (e.g., "alpha_vantage")
    fn name(&self) -> &'static str;

    /// Current quote for a symbol.
    async fn quote(&self, symbol: &str) -> Result<Quote, ProviderError>;

    /// Daily closing prices, most recent first.
    async fn daily_history(
        &self,
        symbol: &str,
        size: OutputSize,
    ) -> Result<PriceSeries, ProviderError>;

    /// Company metadata.
    async fn profile(&self, symbol: &str) -> Result<CompanyProfile, ProviderError>;
}

// ============================================================================
// Tests
// ============================================================================
