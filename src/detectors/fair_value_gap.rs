//! Fair Value Gap scanner
//!
//! Slides a three-candle window over the chronological view of a series. A
//! window whose outer candles' wicks do not overlap leaves an untraded price
//! interval; if the middle candle is significant and the interval is large
//! enough, it is emitted as a [`Gap`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
  observe::{ScanObserver, SkipReason},
  params::{get_percent, ParamMeta, ParameterizedDetector},
  series::Chronological,
  Gap, GapKind, Percent, Result, OHLCV,
};

use super::helpers::{
  self, avg_price, bearish_bounds, bullish_bounds, is_significant_candle, pct_of,
};

/// Outcome of evaluating one window
#[derive(Debug, Clone, PartialEq)]
pub enum WindowScan<D> {
  /// Window out of bounds, or no middle candle at this position
  OutOfRange,
  /// Middle candle failed the significance gate
  Skipped(SkipReason),
  /// Both directions evaluated; either, neither, or (for malformed data) both may be set
  Checked { bullish: Option<Gap<D>>, bearish: Option<Gap<D>> },
}

impl<D> WindowScan<D> {
  /// Gaps produced by this window, bullish first
  pub fn into_gaps(self) -> impl Iterator<Item = Gap<D>> {
    let (bullish, bearish) = match self {
      WindowScan::Checked { bullish, bearish } => (bullish, bearish),
      _ => (None, None),
    };
    bullish.into_iter().chain(bearish)
  }
}

/// FVG - three-candle price imbalance detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FairValueGapDetector {
  /// Minimum gap height, percent of the window's average price
  pub min_gap_size_pct: Percent,
  /// Minimum range or body of the middle candle, percent of the window's average price
  pub min_candle_size_pct: Percent,
}

impl Default for FairValueGapDetector {
  fn default() -> Self {
    Self {
      min_gap_size_pct: Percent::new_const(helpers::DEFAULT_MIN_GAP_SIZE_PCT),
      min_candle_size_pct: Percent::new_const(helpers::DEFAULT_MIN_CANDLE_SIZE_PCT),
    }
  }
}

impl FairValueGapDetector {
  pub fn new(min_gap_size_pct: f64, min_candle_size_pct: f64) -> Result<Self> {
    Ok(Self {
      min_gap_size_pct: Percent::new(min_gap_size_pct)?,
      min_candle_size_pct: Percent::new(min_candle_size_pct)?,
    })
  }

  /// Minimum number of candles for any window to exist
  pub const fn min_bars(&self) -> usize {
    3
  }

  /// Evaluate the window whose middle candle sits at ascending position `pos`.
  pub fn detect_at<T: OHLCV>(&self, view: &Chronological<'_, T>, pos: usize) -> WindowScan<T::Date> {
    if pos == 0 {
      return WindowScan::OutOfRange;
    }
    let (Some(first), Some(middle), Some(third)) =
      (view.get(pos - 1), view.get(pos), view.get(pos.saturating_add(1)))
    else {
      return WindowScan::OutOfRange;
    };

    let base = avg_price(first, third);
    if !is_significant_candle(middle, base, self.min_candle_size_pct.get()) {
      return WindowScan::Skipped(SkipReason::InsignificantCandle);
    }

    let origin_index = view.original_index(pos);
    let min_gap = self.min_gap_size_pct.get();
    let emit = |kind: GapKind, (upper, lower): (f64, f64)| {
      (pct_of(upper - lower, base) >= min_gap)
        .then(|| Gap::new(kind, origin_index, middle.date(), upper, lower))
    };

    WindowScan::Checked {
      bullish: bullish_bounds(first, third).and_then(|b| emit(GapKind::Bullish, b)),
      bearish: bearish_bounds(first, third).and_then(|b| emit(GapKind::Bearish, b)),
    }
  }

  /// Scan every window of the view. Gaps come out in chronological order of
  /// their origin; fill state is untouched.
  pub fn scan<T: OHLCV, O: ScanObserver>(
    &self,
    view: &Chronological<'_, T>,
    observer: &O,
  ) -> Vec<Gap<T::Date>> {
    let mut gaps = Vec::new();
    if view.len() < self.min_bars() {
      return gaps;
    }

    for pos in 1..view.len() - 1 {
      match self.detect_at(view, pos) {
        WindowScan::Skipped(reason) => {
          observer.on_window_skipped(view.original_index(pos), reason)
        },
        outcome => {
          for gap in outcome.into_gaps() {
            observer.on_gap_detected(&gap);
            gaps.push(gap);
          }
        },
      }
    }

    gaps
  }
}

// ============================================================
// PARAMETERS
// ============================================================

const FVG_PARAMS: &[ParamMeta] = &[
  ParamMeta::percent(
    "min_gap_size_pct",
    helpers::DEFAULT_MIN_GAP_SIZE_PCT,
    (0.0, 2.0, 0.05),
    "Minimum gap height as percent of average price",
  ),
  ParamMeta::percent(
    "min_candle_size_pct",
    helpers::DEFAULT_MIN_CANDLE_SIZE_PCT,
    (0.0, 2.0, 0.1),
    "Minimum middle-candle range or body as percent of average price",
  ),
];

impl ParameterizedDetector for FairValueGapDetector {
  fn param_meta() -> &'static [ParamMeta] {
    FVG_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    for meta in FVG_PARAMS {
      if let Some(&value) = params.get(meta.name) {
        meta.validate(value)?;
      }
    }
    Ok(Self {
      min_gap_size_pct: get_percent(params, "min_gap_size_pct", helpers::DEFAULT_MIN_GAP_SIZE_PCT)?,
      min_candle_size_pct: get_percent(
        params,
        "min_candle_size_pct",
        helpers::DEFAULT_MIN_CANDLE_SIZE_PCT,
      )?,
    })
  }

  fn detector_name() -> &'static str {
    "FAIR_VALUE_GAP"
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{observe::NoopObserver, Candle, SeriesOrder};

  fn bar(date: u32, o: f64, h: f64, l: f64, c: f64) -> Candle<u32> {
    Candle::new(date, o, h, l, c, 100.0)
  }

  /// c1.high = 10, c3.low = 13, middle body 2.6
  fn bullish_window() -> Vec<Candle<u32>> {
    vec![
      bar(1, 9.2, 10.0, 9.0, 9.8),
      bar(2, 8.2, 11.0, 8.0, 10.8),
      bar(3, 13.2, 14.0, 13.0, 13.8),
    ]
  }

  #[test]
  fn test_detect_at_bullish() {
    let bars = bullish_window();
    let view = Chronological::new(&bars, SeriesOrder::Ascending);
    let detector = FairValueGapDetector::default();

    let gaps: Vec<_> = detector.detect_at(&view, 1).into_gaps().collect();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].kind(), GapKind::Bullish);
    assert_eq!(gaps[0].lower_bound(), 10.0);
    assert_eq!(gaps[0].upper_bound(), 13.0);
    assert_eq!(*gaps[0].origin_date(), 2);
  }

  #[test]
  fn test_detect_at_edges_out_of_range() {
    let bars = bullish_window();
    let view = Chronological::new(&bars, SeriesOrder::Ascending);
    let detector = FairValueGapDetector::default();

    assert_eq!(detector.detect_at(&view, 0), WindowScan::OutOfRange);
    assert_eq!(detector.detect_at(&view, 2), WindowScan::OutOfRange);
    assert_eq!(detector.detect_at(&view, usize::MAX), WindowScan::OutOfRange);
  }

  #[test]
  fn test_doji_middle_is_skipped() {
    let bars = vec![
      bar(1, 9.2, 10.0, 9.0, 9.8),
      bar(2, 11.5, 11.51, 11.5, 11.5),
      bar(3, 13.2, 14.0, 13.0, 13.8),
    ];
    let view = Chronological::new(&bars, SeriesOrder::Ascending);
    let detector = FairValueGapDetector::default();

    assert_eq!(
      detector.detect_at(&view, 1),
      WindowScan::Skipped(SkipReason::InsignificantCandle)
    );
  }

  #[test]
  fn test_bearish_bounds() {
    let bars = vec![
      bar(1, 20.5, 21.0, 20.0, 20.2),
      bar(2, 19.8, 20.0, 16.5, 16.8),
      bar(3, 16.8, 17.0, 16.0, 16.2),
    ];
    let view = Chronological::new(&bars, SeriesOrder::Ascending);
    let gaps = FairValueGapDetector::default().scan(&view, &NoopObserver);

    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].kind(), GapKind::Bearish);
    assert_eq!(gaps[0].upper_bound(), 20.0);
    assert_eq!(gaps[0].lower_bound(), 17.0);
    assert_eq!(gaps[0].id().as_str(), "bearish-1");
  }

  #[test]
  fn test_gap_below_threshold_is_dropped() {
    let bars = bullish_window();
    let view = Chronological::new(&bars, SeriesOrder::Ascending);
    // gap is 3 / 11.8 ~ 25.4%
    let strict = FairValueGapDetector::new(30.0, 0.2).unwrap();
    assert!(strict.scan(&view, &NoopObserver).is_empty());
    let loose = FairValueGapDetector::new(25.0, 0.2).unwrap();
    assert_eq!(loose.scan(&view, &NoopObserver).len(), 1);
  }

  #[test]
  fn test_gap_at_threshold_is_inclusive() {
    // avg close 100, gap 1.0 = 1%
    let bars = vec![
      bar(1, 99.5, 100.0, 98.8, 99.0),
      bar(2, 100.2, 101.5, 99.6, 100.8),
      bar(3, 101.5, 102.0, 101.0, 101.0),
    ];
    let view = Chronological::new(&bars, SeriesOrder::Ascending);

    let at = FairValueGapDetector::new(1.0, 0.2).unwrap();
    assert_eq!(at.scan(&view, &NoopObserver).len(), 1);
    let above = FairValueGapDetector::new(1.0001, 0.2).unwrap();
    assert!(above.scan(&view, &NoopObserver).is_empty());
  }

  #[test]
  fn test_malformed_window_may_emit_both() {
    // c1 has high < low; both inequalities hold against c3
    let bars = vec![
      bar(1, 10.0, 5.0, 20.0, 10.0),
      bar(2, 8.0, 16.0, 8.0, 14.0),
      bar(3, 10.0, 15.0, 6.0, 10.0),
    ];
    let view = Chronological::new(&bars, SeriesOrder::Ascending);
    let gaps = FairValueGapDetector::new(0.0, 0.0).unwrap().scan(&view, &NoopObserver);
    let kinds: Vec<_> = gaps.iter().map(|g| g.kind()).collect();
    assert_eq!(kinds, vec![GapKind::Bullish, GapKind::Bearish]);
  }

  #[test]
  fn test_with_params_defaults_and_overrides() {
    let mut params = HashMap::new();
    let d = FairValueGapDetector::with_params(&params).unwrap();
    assert_eq!(d, FairValueGapDetector::default());

    params.insert("min_candle_size_pct", 1.5);
    let d = FairValueGapDetector::with_params(&params).unwrap();
    assert_eq!(d.min_candle_size_pct.get(), 1.5);
    assert_eq!(d.min_gap_size_pct.get(), 0.1);

    params.insert("min_gap_size_pct", f64::NAN);
    assert!(FairValueGapDetector::with_params(&params).is_err());
  }

  #[test]
  fn test_with_params_enforces_advertised_range() {
    let mut params = HashMap::new();
    params.insert("min_gap_size_pct", 2.0);
    assert!(FairValueGapDetector::with_params(&params).is_ok());

    params.insert("min_gap_size_pct", 50.0);
    assert_eq!(
      FairValueGapDetector::with_params(&params).unwrap_err(),
      crate::GapError::OutOfRange { field: "min_gap_size_pct", value: 50.0, min: 0.0, max: 2.0 }
    );

    params.insert("min_gap_size_pct", 0.5);
    params.insert("min_candle_size_pct", -0.1);
    assert!(FairValueGapDetector::with_params(&params).is_err());
  }
}
