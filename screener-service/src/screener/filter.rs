//! Filter evaluation for screening candidates.
//!
//! A [`FilterSpec`] is a set of optional bounds. Every configured bound must
//! hold; a bound whose metric could not be computed for a candidate is
//! skipped rather than failed.

use serde::{de, Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::indicators::IndicatorSet;

// ============================================================================
// Filter Bounds
// ============================================================================

/// User-supplied screening filters, as posted by clients.
///
/// Numeric options accept JSON numbers or numeric strings; empty strings
/// count as unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    /// Reject when price is above this
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    /// Inclusive lower RSI bound
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub rsi_min: Option<f64>,
    /// Inclusive upper RSI bound
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub rsi_max: Option<f64>,
    /// Position relative to the moving averages (see [`Ma50Position`])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ma50_position: Option<String>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub short_interest_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub short_interest_max: Option<f64>,
    /// Swing sub-category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    /// Growth sub-category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_sector: Option<String>,
}

impl FilterSpec {
    /// Parsed moving-average constraint.
    ///
    /// Unset or empty means no constraint. An unrecognized value also imposes
    /// no constraint and is logged.
    pub fn ma50_constraint(&self) -> Option<Ma50Position> {
        let raw = self.ma50_position.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let position = Ma50Position::parse(raw);
        if position.is_none() {
            warn!(ma50_position = raw, "Unknown ma50Position, ignoring");
        }
        position
    }
}

/// Accept `30`, `"30"`, `""` (unset) or `null`; reject other strings.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("expected a number, got {:?}", text)))
        }
    }
}

/// Price position relative to the 50- and 200-day averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ma50Position {
    /// Above both averages
    AboveBoth,
    /// Above the 50-day average
    AboveMa50,
    /// Below the 50-day average
    BelowMa50,
    /// Above the 50-day average but below the 200-day
    Between,
}

impl Ma50Position {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "above_both" => Some(Self::AboveBoth),
            "above_ma50" => Some(Self::AboveMa50),
            "below_ma50" => Some(Self::BelowMa50),
            "between" => Some(Self::Between),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AboveBoth => "above_both",
            Self::AboveMa50 => "above_ma50",
            Self::BelowMa50 => "below_ma50",
            Self::Between => "between",
        }
    }

    fn holds(&self, from_ma50: f64, from_ma200: f64) -> bool {
        match self {
            Self::AboveBoth => from_ma50 >= 0.0 && from_ma200 >= 0.0,
            Self::AboveMa50 => from_ma50 >= 0.0,
            Self::BelowMa50 => from_ma50 <= 0.0,
            Self::Between => from_ma50 >= 0.0 && from_ma200 <= 0.0,
        }
    }
}

impl std::fmt::Display for Ma50Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Metrics of one candidate the filters look at.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CandidateMetrics {
    pub price: f64,
    pub rsi: Option<f64>,
    pub distance_from_ma50: Option<f64>,
    pub distance_from_ma200: Option<f64>,
    pub short_interest: Option<f64>,
}

impl CandidateMetrics {
    /// Metrics from a quote price and its indicators. RSI stays unrounded.
    pub fn new(price: f64, indicators: &IndicatorSet, short_interest: Option<f64>) -> Self {
        Self {
            price,
            rsi: indicators.rsi,
            distance_from_ma50: indicators.distance_from_ma50,
            distance_from_ma200: indicators.distance_from_ma200,
            short_interest,
        }
    }
}

/// The first filter a candidate failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterRejection {
    #[error("price {price} above max {max}")]
    MaxPrice { price: f64, max: f64 },
    #[error("RSI {rsi} below min {min}")]
    RsiMin { rsi: f64, min: f64 },
    #[error("RSI {rsi} above max {max}")]
    RsiMax { rsi: f64, max: f64 },
    #[error("MA distances ({from_ma50}%, {from_ma200}%) not {position}")]
    Ma50Position {
        position: Ma50Position,
        from_ma50: f64,
        from_ma200: f64,
    },
    #[error("short interest {value} above max {max}")]
    ShortInterestMax { value: f64, max: f64 },
    #[error("short interest {value} below min {min}")]
    ShortInterestMin { value: f64, min: f64 },
}

/// Check every configured bound, in a fixed order.
pub fn evaluate(spec: &FilterSpec, metrics: &CandidateMetrics) -> Result<(), FilterRejection> {
    if let Some(max) = spec.max_price {
        if metrics.price > max {
            return Err(FilterRejection::MaxPrice {
                price: metrics.price,
                max,
            });
        }
    }

    if let Some(rsi) = metrics.rsi {
        if let Some(min) = spec.rsi_min {
            if rsi < min {
                return Err(FilterRejection::RsiMin { rsi, min });
            }
        }
        if let Some(max) = spec.rsi_max {
            if rsi > max {
                return Err(FilterRejection::RsiMax { rsi, max });
            }
        }
    }

    if let (Some(position), Some(from_ma50), Some(from_ma200)) = (
        spec.ma50_constraint(),
        metrics.distance_from_ma50,
        metrics.distance_from_ma200,
    ) {
        if !position.holds(from_ma50, from_ma200) {
            return Err(FilterRejection::Ma50Position {
                position,
                from_ma50,
                from_ma200,
            });
        }
    }

    if let Some(value) = metrics.short_interest {
        if let Some(max) = spec.short_interest_max {
            if value > max {
                return Err(FilterRejection::ShortInterestMax { value, max });
            }
        }
        if let Some(min) = spec.short_interest_min {
            if value < min {
                return Err(FilterRejection::ShortInterestMin { value, min });
            }
        }
    }

    Ok(())
}

/// Whether a candidate satisfies every configured bound.
pub fn passes(spec: &FilterSpec, metrics: &CandidateMetrics) -> bool {
    evaluate(spec, metrics).is_ok()
}

// ============================================================================
// Tests
// ============================================================================
