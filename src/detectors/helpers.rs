//! Shared arithmetic for gap detection.
//!
//! All thresholds are percentages of a per-window normalisation base, the
//! average close of the two outer candles.

use crate::{OHLCVExt, OHLCV};

// ============================================================
// DEFAULT THRESHOLDS
// ============================================================

/// Minimum gap height, percent of the window's average price
pub const DEFAULT_MIN_GAP_SIZE_PCT: f64 = 0.1;
/// Minimum range or body of the middle candle, percent of the window's average price
pub const DEFAULT_MIN_CANDLE_SIZE_PCT: f64 = 0.2;

// ============================================================
// HELPER FUNCTIONS
// ============================================================

/// Normalisation base for a window: mean close of the outer candles
#[inline]
pub fn avg_price<T: OHLCV>(first: &T, third: &T) -> f64 {
    (first.close() + third.close()) / 2.0
}

/// `value` expressed as percent of `base`
#[inline]
pub fn pct_of(value: f64, base: f64) -> f64 {
    value / base * 100.0
}

/// Absolute size corresponding to `pct` percent of `base`
#[inline]
pub fn pct_threshold(base: f64, pct: f64) -> f64 {
    base * pct / 100.0
}

/// Middle-candle significance gate: range **or** body must reach the threshold.
/// Filters out near-doji noise candles.
#[inline]
pub fn is_significant_candle<T: OHLCV>(bar: &T, base: f64, min_candle_size_pct: f64) -> bool {
    let threshold = pct_threshold(base, min_candle_size_pct);
    bar.range() >= threshold || bar.body() >= threshold
}

/// Bullish imbalance between the outer candles: `(upper, lower)` when
/// `first.high < third.low`
#[inline]
pub fn bullish_bounds<T: OHLCV>(first: &T, third: &T) -> Option<(f64, f64)> {
    (first.high() < third.low()).then(|| (third.low(), first.high()))
}

/// Bearish imbalance between the outer candles: `(upper, lower)` when
/// `first.low > third.high`
#[inline]
pub fn bearish_bounds<T: OHLCV>(first: &T, third: &T) -> Option<(f64, f64)> {
    (first.low() > third.high()).then(|| (first.low(), third.high()))
}
