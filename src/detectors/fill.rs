//! Fill tracking for detected gaps
//!
//! A gap is filled by the first candle after its origin, in time order, that
//! trades back through the gap's far boundary:
//! - bullish: `low <= lower_bound`
//! - bearish: `high >= upper_bound`
//!
//! The walk always runs forward in time. For a descending (newest-first)
//! series that means walking from `origin_index - 1` down to `0`; for an
//! ascending series, from `origin_index + 1` up to the last candle.

use rayon::prelude::*;

use crate::{observe::ScanObserver, series::Chronological, Gap, GapKind, OHLCV};

/// True if `bar` trades through the fill boundary of a gap of `kind`
#[inline]
pub fn crosses<T: OHLCV>(kind: GapKind, upper: f64, lower: f64, bar: &T) -> bool {
  match kind {
    GapKind::Bullish => bar.low() <= lower,
    GapKind::Bearish => bar.high() >= upper,
  }
}

/// Marks gaps filled against the candles that follow them
#[derive(Debug, Clone, Copy, Default)]
pub struct FillTracker;

impl FillTracker {
  /// First candle after the gap's origin that fills it, with its as-supplied index.
  ///
  /// Returns `None` when nothing fills the gap, or when the gap's origin lies
  /// outside the view (gap from a different series).
  pub fn first_fill<'a, T: OHLCV>(
    view: &Chronological<'a, T>,
    gap: &Gap<T::Date>,
  ) -> Option<(usize, &'a T)> {
    if gap.origin_index() >= view.len() {
      return None;
    }
    let pos = view.position_of(gap.origin_index());
    let (kind, upper, lower) = (gap.kind(), gap.upper_bound(), gap.lower_bound());
    view.after(pos).find(|(_, bar)| crosses(kind, upper, lower, *bar))
  }

  /// Update one gap. Returns true if it became filled by this call;
  /// a gap that was already filled is left as is.
  pub fn track_one<T: OHLCV, O: ScanObserver>(
    view: &Chronological<'_, T>,
    gap: &mut Gap<T::Date>,
    observer: &O,
  ) -> bool {
    if gap.is_filled() {
      return false;
    }
    let Some((index, bar)) = Self::first_fill(view, gap) else {
      return false;
    };
    let newly = gap.mark_filled(bar.date());
    if newly {
      observer.on_gap_filled(gap, index);
    }
    newly
  }

  /// Update every gap sequentially. Returns the number newly filled.
  pub fn track<T: OHLCV, O: ScanObserver>(
    view: &Chronological<'_, T>,
    gaps: &mut [Gap<T::Date>],
    observer: &O,
  ) -> usize {
    gaps
      .iter_mut()
      .map(|gap| Self::track_one(view, gap, observer))
      .filter(|&newly| newly)
      .count()
  }

  /// Same result as [`FillTracker::track`], with gaps spread over the rayon pool.
  pub fn track_parallel<T, O>(
    view: &Chronological<'_, T>,
    gaps: &mut [Gap<T::Date>],
    observer: &O,
  ) -> usize
  where
    T: OHLCV + Sync,
    T::Date: Send,
    O: ScanObserver,
  {
    gaps
      .par_iter_mut()
      .filter(|gap| !gap.is_filled())
      .map(|gap| Self::track_one(view, gap, observer) as usize)
      .sum()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{observe::NoopObserver, Candle, SeriesOrder};

  fn bar(date: i64, h: f64, l: f64) -> Candle<i64> {
    Candle::new(date, l, h, l, h, 0.0)
  }

  #[test]
  fn test_bullish_fill_descending_walks_toward_zero() {
    // newest first: index 0 is date 5
    let bars = vec![
      bar(5, 99.0, 94.0),
      bar(4, 101.0, 95.0),
      bar(3, 120.0, 110.0),
      bar(2, 108.0, 103.0),
      bar(1, 100.0, 97.0),
    ];
    let view = Chronological::new(&bars, SeriesOrder::Descending);
    let mut gap = Gap::new(GapKind::Bullish, 3, 2, 110.0, 100.0);

    assert!(FillTracker::track_one(&view, &mut gap, &NoopObserver));
    // index 1 (date 4) is the first later candle with low <= 100
    assert_eq!(gap.filled_date(), Some(&4));
  }

  #[test]
  fn test_bearish_fill_ascending_walks_forward() {
    let bars = vec![
      bar(1, 50.0, 48.0),
      bar(2, 47.0, 44.0),
      bar(3, 44.0, 42.0),
      bar(4, 49.0, 45.0),
      bar(5, 51.0, 47.0),
    ];
    let view = Chronological::new(&bars, SeriesOrder::Ascending);
    let mut gap = Gap::new(GapKind::Bearish, 1, 2, 48.0, 44.0);

    let (index, _) = FillTracker::first_fill(&view, &gap).unwrap();
    assert_eq!(index, 3);
    assert!(FillTracker::track_one(&view, &mut gap, &NoopObserver));
    assert_eq!(gap.filled_date(), Some(&4));
  }

  #[test]
  fn test_low_equal_to_lower_bound_fills_bullish() {
    let bars = vec![bar(1, 10.0, 9.0), bar(2, 11.0, 8.0), bar(3, 14.0, 13.0), bar(4, 14.5, 10.0)];
    let view = Chronological::new(&bars, SeriesOrder::Ascending);

    let mut gap = Gap::new(GapKind::Bullish, 1, 2, 13.0, 10.0);
    assert!(FillTracker::track_one(&view, &mut gap, &NoopObserver));
    assert_eq!(gap.filled_date(), Some(&4));

    let above = vec![bar(1, 10.0, 9.0), bar(2, 11.0, 8.0), bar(3, 14.0, 13.0), bar(4, 14.5, 10.01)];
    let view = Chronological::new(&above, SeriesOrder::Ascending);
    let mut gap = Gap::new(GapKind::Bullish, 1, 2, 13.0, 10.0);
    assert!(!FillTracker::track_one(&view, &mut gap, &NoopObserver));
  }

  #[test]
  fn test_high_equal_to_upper_bound_fills_bearish() {
    let bars = vec![bar(1, 21.0, 20.0), bar(2, 20.0, 16.5), bar(3, 17.0, 16.0), bar(4, 20.0, 16.1)];
    let view = Chronological::new(&bars, SeriesOrder::Ascending);

    let mut gap = Gap::new(GapKind::Bearish, 1, 2, 20.0, 17.0);
    assert!(FillTracker::track_one(&view, &mut gap, &NoopObserver));
    assert_eq!(gap.filled_date(), Some(&4));

    let below = vec![bar(1, 21.0, 20.0), bar(2, 20.0, 16.5), bar(3, 17.0, 16.0), bar(4, 19.99, 16.1)];
    let view = Chronological::new(&below, SeriesOrder::Ascending);
    let mut gap = Gap::new(GapKind::Bearish, 1, 2, 20.0, 17.0);
    assert!(!FillTracker::track_one(&view, &mut gap, &NoopObserver));
  }

  #[test]
  fn test_earlier_candles_never_fill() {
    // the crossing candle is older than the origin
    let bars = vec![bar(1, 100.0, 90.0), bar(2, 105.0, 101.0), bar(3, 112.0, 106.0)];
    let view = Chronological::new(&bars, SeriesOrder::Ascending);
    let mut gap = Gap::new(GapKind::Bullish, 1, 2, 106.0, 100.0);

    assert!(!FillTracker::track_one(&view, &mut gap, &NoopObserver));
    assert!(!gap.is_filled());
    assert!(gap.filled_date().is_none());
  }

  #[test]
  fn test_foreign_origin_is_ignored() {
    let bars = vec![bar(1, 10.0, 9.0)];
    let view = Chronological::new(&bars, SeriesOrder::Descending);
    let gap = Gap::new(GapKind::Bullish, 7, 0, 11.0, 10.0);
    assert!(FillTracker::first_fill(&view, &gap).is_none());
  }

  #[test]
  fn test_parallel_matches_sequential() {
    let bars: Vec<Candle<i64>> = (0..200)
      .map(|i| {
        let base = 100.0 + ((i * 37) % 23) as f64;
        bar(i, base + 2.0, base - 2.0)
      })
      .collect();
    let view = Chronological::new(&bars, SeriesOrder::Ascending);
    let make = || -> Vec<Gap<i64>> {
      (0..150)
        .map(|i| {
          let kind = if i % 2 == 0 { GapKind::Bullish } else { GapKind::Bearish };
          let mid = 100.0 + (i % 19) as f64;
          Gap::new(kind, i as usize, i, mid + 1.0, mid - 1.0)
        })
        .collect()
    };

    let mut seq = make();
    let mut par = make();
    let n_seq = FillTracker::track(&view, &mut seq, &NoopObserver);
    let n_par = FillTracker::track_parallel(&view, &mut par, &NoopObserver);

    assert_eq!(n_seq, n_par);
    assert_eq!(seq, par);
  }
}
