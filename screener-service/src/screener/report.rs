//! Screening output: accepted records, skipped symbols and the report
//! returned to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{CompanyProfile, Quote};
use crate::indicators::IndicatorSet;

use super::engine::SkipReason;

/// Upside target relative to entry
const TARGET_MULTIPLIER: f64 = 1.25;
/// Stop-loss relative to entry
const STOP_LOSS_MULTIPLIER: f64 = 0.90;
/// Label matching the target/stop-loss multipliers
const RISK_REWARD_LABEL: &str = "1:2.5";

/// Placeholder for missing profile fields
pub const NOT_AVAILABLE: &str = "N/A";

// ============================================================================
// Candidate Record
// ============================================================================

/// A symbol that passed every filter, with its trade plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub ticker: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub sector: String,
    /// Formatted, e.g. `"2.9T"`
    pub market_cap: String,
    pub entry: f64,
    pub target: f64,
    pub stop_loss: f64,
    pub risk_reward: String,
    pub rsi: Option<f64>,
    #[serde(rename = "distanceFromMA50")]
    pub distance_from_ma50: Option<f64>,
    #[serde(rename = "distanceFromMA200")]
    pub distance_from_ma200: Option<f64>,
    /// Placeholder estimate, present only when a profile was available
    pub short_interest: Option<f64>,
}

impl CandidateRecord {
    /// Build the record for an accepted symbol.
    ///
    /// Without a profile the name falls back to the ticker and sector/market
    /// cap to `"N/A"`.
    pub fn assemble(
        quote: &Quote,
        profile: Option<&CompanyProfile>,
        indicators: &IndicatorSet,
        short_interest: Option<f64>,
    ) -> Self {
        let non_empty = |value: &str| (!value.trim().is_empty()).then(|| value.to_string());

        let name = profile
            .and_then(|p| non_empty(&p.name))
            .unwrap_or_else(|| quote.symbol.clone());
        let sector = profile
            .and_then(|p| non_empty(&p.sector))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let market_cap = profile
            .map(|p| format_market_cap(&p.market_cap))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        Self {
            ticker: quote.symbol.clone(),
            name,
            price: quote.price,
            change: quote.change,
            change_percent: quote.change_percent,
            volume: quote.volume,
            sector,
            market_cap,
            entry: quote.price,
            target: quote.price * TARGET_MULTIPLIER,
            stop_loss: quote.price * STOP_LOSS_MULTIPLIER,
            risk_reward: RISK_REWARD_LABEL.to_string(),
            rsi: indicators.rounded_rsi(),
            distance_from_ma50: indicators.distance_from_ma50,
            distance_from_ma200: indicators.distance_from_ma200,
            short_interest,
        }
    }
}

/// Human-readable market capitalization.
///
/// `T`/`B` with one decimal, `M` with none, smaller values as raw digits.
/// Only the leading integer part of the input is read; anything without one
/// (including `"N/A"`) formats as `"N/A"`.
pub fn format_market_cap(raw: &str) -> String {
    const TRILLION: f64 = 1e12;
    const BILLION: f64 = 1e9;
    const MILLION: f64 = 1e6;

    let trimmed = raw.trim();
    let sign_len = usize::from(trimmed.starts_with('-') || trimmed.starts_with('+'));
    let digits_len = trimmed[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();

    if digits_len == 0 {
        return NOT_AVAILABLE.to_string();
    }

    let Ok(cap) = trimmed[..sign_len + digits_len].parse::<i128>() else {
        return NOT_AVAILABLE.to_string();
    };

    let value = cap as f64;
    // halves round up, not to even
    let tenths = |unit: f64| (value / unit * 10.0).round() / 10.0;

    if value >= TRILLION {
        format!("{:.1}T", tenths(TRILLION))
    } else if value >= BILLION {
        format!("{:.1}B", tenths(BILLION))
    } else if value >= MILLION {
        format!("{:.0}M", (value / MILLION).round())
    } else {
        cap.to_string()
    }
}

// ============================================================================
// Skipped Symbols
// ============================================================================

/// A symbol left out of the result, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

impl SkippedSymbol {
    pub fn new(symbol: impl Into<String>, reason: &SkipReason) -> Self {
        Self {
            symbol: symbol.into(),
            reason: reason.to_string(),
        }
    }
}

// ============================================================================
// Screen Report
// ============================================================================

/// Outcome of one screening request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenReport {
    /// Screening ID (timestamp-based)
    pub id: String,
    /// Sub-category actually screened
    pub category: String,
    /// Accepted symbols, in screening order
    pub stocks: Vec<CandidateRecord>,
    /// Symbols that were skipped or filtered out
    pub skipped: Vec<SkippedSymbol>,
    /// Batch-size constraint explanation
    pub note: String,
    /// External calls made (cache hits excluded)
    pub external_calls: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl ScreenReport {
    /// Number of symbols looked at.
    pub fn total_screened(&self) -> usize {
        self.stocks.len() + self.skipped.len()
    }

    /// Summary string for logging.
    pub fn summary(&self) -> String {
        let elapsed = self.completed_at - self.started_at;
        let duration_secs = elapsed.num_milliseconds() as f64 / 1000.0;
        format!(
            "Screened {} symbols in {:.1}s: {} passed, {} skipped, {} external calls",
            self.total_screened(),
            duration_secs,
            self.stocks.len(),
            self.skipped.len(),
            self.external_calls
        )
    }
}

/// Note attached to every report.
pub fn batch_note(batch_size: usize) -> String {
    format!(
        "Live data with technical indicators. Free tier: max {} symbols per query.",
        batch_size
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn quote() -> Quote {
        Quote {
            symbol: "NVDA".into(),
            price: 100.0,
            change: 2.0,
            change_percent: 2.04,
            volume: 42_000_000,
            high: 101.0,
            low: 97.5,
        }
    }

    fn profile() -> CompanyProfile {
        CompanyProfile {
            symbol: "NVDA".into(),
            name: "NVIDIA Corporation".into(),
            sector: "TECHNOLOGY".into(),
            market_cap: "2900000000000".into(),
            pe_ratio: 65.2,
            dividend_yield: 0.0003,
            profit_margin: 0.488,
            revenue_growth: 2.653,
            description: String::new(),
        }
    }

    #[test]
    fn test_format_market_cap() {
        assert_eq!(format_market_cap("2500000000000"), "2.5T");
        assert_eq!(format_market_cap("3400000000"), "3.4B");
        assert_eq!(format_market_cap("12000000"), "12M");
        assert_eq!(format_market_cap("950000"), "950000");
        assert_eq!(format_market_cap("N/A"), "N/A");
        assert_eq!(format_market_cap(""), "N/A");
        assert_eq!(format_market_cap("None"), "N/A");
    }

    #[test]
    fn test_format_market_cap_rounds_halves_up() {
        assert_eq!(format_market_cap("12500000"), "13M");
        assert_eq!(format_market_cap("2500000"), "3M");
        assert_eq!(format_market_cap("2250000000000"), "2.3T");
        assert_eq!(format_market_cap("1250000000"), "1.3B");
        assert_eq!(format_market_cap("1240000000"), "1.2B");
    }

    #[test]
    fn test_format_market_cap_reads_leading_integer() {
        assert_eq!(format_market_cap("12000000.75"), "12M");
        assert_eq!(format_market_cap(" 3400000000 "), "3.4B");
    }

    #[test]
    fn test_assemble_with_profile() {
        let indicators = IndicatorSet {
            rsi: Some(61.3),
            distance_from_ma50: Some(4.2),
            distance_from_ma200: Some(18.9),
            ma50: Some(96.0),
            ma200: Some(84.1),
        };
        let record = CandidateRecord::assemble(&quote(), Some(&profile()), &indicators, Some(7.5));

        assert_eq!(record.name, "NVIDIA Corporation");
        assert_eq!(record.market_cap, "2.9T");
        assert_eq!(record.entry, 100.0);
        assert_eq!(record.target, 125.0);
        assert_eq!(record.stop_loss, 90.0);
        assert_eq!(record.risk_reward, "1:2.5");
        assert_eq!(record.rsi, Some(61.3));
        assert_eq!(record.short_interest, Some(7.5));
    }

    #[test]
    fn test_assemble_without_profile_uses_placeholders() {
        let record =
            CandidateRecord::assemble(&quote(), None, &IndicatorSet::unavailable(), None);

        assert_eq!(record.name, "NVDA");
        assert_eq!(record.sector, "N/A");
        assert_eq!(record.market_cap, "N/A");
        assert!(record.rsi.is_none());
        assert!(record.short_interest.is_none());
    }

    #[test]
    fn test_record_json_shape() {
        let record =
            CandidateRecord::assemble(&quote(), None, &IndicatorSet::unavailable(), None);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["ticker"], "NVDA");
        assert_eq!(json["changePercent"], 2.04);
        assert_eq!(json["stopLoss"], 90.0);
        assert_eq!(json["riskReward"], "1:2.5");
        assert!(json["distanceFromMA50"].is_null());
        assert!(json.get("shortInterest").is_some());
    }
}
