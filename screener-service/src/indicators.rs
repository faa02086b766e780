//! Technical indicators computed from a daily close series.
//!
//! Deliberately simple approximations: RSI is a plain average of gains and
//! losses over the window (no Wilder smoothing), and moving averages are
//! arithmetic means of the most recent closes. All functions are pure.
//!
//! Series are ordered most recent first, as [`PriceSeries`] holds them.

use serde::{Deserialize, Serialize};

use screener_common::config::MovingAverageMode;
use screener_common::util::round_to;

use crate::data::PriceSeries;

/// RSI window
pub const RSI_PERIOD: usize = 14;

/// Short moving-average window
pub const MA_SHORT_WINDOW: usize = 50;

/// Long moving-average window
pub const MA_LONG_WINDOW: usize = 200;

// ============================================================================
// RSI
// ============================================================================

/// Relative Strength Index over `period` transitions.
///
/// Needs at least `period + 1` samples; returns `None` otherwise. Returns
/// exactly 100 when there were no losses in the window.
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let (gains, losses) = prices[..=period]
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(gains, losses), change| {
            if change > 0.0 {
                (gains + change, losses)
            } else {
                (gains, losses + change.abs())
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

// ============================================================================
// Moving Average Distance
// ============================================================================

/// Distance of a price from its 50- and 200-day averages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovingAverageDistance {
    /// `(price - ma50) / ma50 * 100`, 2 decimals
    #[serde(rename = "distanceFromMA50")]
    pub distance_from_ma50: f64,
    /// `(price - ma200) / ma200 * 100`, 2 decimals
    #[serde(rename = "distanceFromMA200")]
    pub distance_from_ma200: f64,
    pub ma50: f64,
    pub ma200: f64,
}

/// Average of the first `window` samples.
///
/// With [`MovingAverageMode::FixedWindow`] the sum is always divided by
/// `window`, so a shorter series reads low.
fn moving_average(prices: &[f64], window: usize, mode: MovingAverageMode) -> Option<f64> {
    let samples = &prices[..prices.len().min(window)];
    if samples.is_empty() {
        return None;
    }

    let divisor = match mode {
        MovingAverageMode::FixedWindow => window,
        MovingAverageMode::AvailableSamples => samples.len(),
    };

    let average = samples.iter().sum::<f64>() / divisor as f64;
    (average != 0.0 && average.is_finite()).then_some(average)
}

/// Distance of `current_price` from the 50- and 200-day averages of `prices`.
///
/// The 200-day average always uses the samples available (at most 200).
/// Returns `None` for an empty series or a zero average.
pub fn ma_distance(
    current_price: f64,
    prices: &[f64],
    mode: MovingAverageMode,
) -> Option<MovingAverageDistance> {
    let ma50 = moving_average(prices, MA_SHORT_WINDOW, mode)?;
    let ma200 = moving_average(prices, MA_LONG_WINDOW, MovingAverageMode::AvailableSamples)?;

    let distance = |ma: f64| round_to((current_price - ma) / ma * 100.0, 2);

    Some(MovingAverageDistance {
        distance_from_ma50: distance(ma50),
        distance_from_ma200: distance(ma200),
        ma50: round_to(ma50, 2),
        ma200: round_to(ma200, 2),
    })
}

// ============================================================================
// Indicator Set
// ============================================================================

/// Indicators derived for one symbol. Absent values mean "not enough data".
///
/// `rsi` is kept unrounded so filter bounds compare the exact value; the
/// distances and averages are already rounded to 2 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSet {
    pub rsi: Option<f64>,
    #[serde(rename = "distanceFromMA50")]
    pub distance_from_ma50: Option<f64>,
    #[serde(rename = "distanceFromMA200")]
    pub distance_from_ma200: Option<f64>,
    pub ma50: Option<f64>,
    pub ma200: Option<f64>,
}

impl IndicatorSet {
    /// Nothing computable (no history).
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// RSI rounded to 2 decimals, for output.
    pub fn rounded_rsi(&self) -> Option<f64> {
        self.rsi.map(|v| round_to(v, 2))
    }

    /// RSI and MA distances of `current_price` against `series`.
    pub fn compute(current_price: f64, series: &PriceSeries, mode: MovingAverageMode) -> Self {
        let closes = series.closes();
        let distances = ma_distance(current_price, closes, mode);

        Self {
            rsi: rsi(closes, RSI_PERIOD),
            distance_from_ma50: distances.map(|d| d.distance_from_ma50),
            distance_from_ma200: distances.map(|d| d.distance_from_ma200),
            ma50: distances.map(|d| d.ma50),
            ma200: distances.map(|d| d.ma200),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
