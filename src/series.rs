//! Chronological view over a candle slice.
//!
//! Callers hand over candles in whatever order their data source produced.
//! Detection needs "c1 precedes c2 precedes c3" in time, and fill tracking
//! needs to walk forward in time from a gap. [`Chronological`] gives both
//! without copying the slice, and translates positions back to the caller's
//! indices.

use serde::{Deserialize, Serialize};

use crate::OHLCV;

/// Native ordering of a candle series as supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesOrder {
    /// Index 0 is the oldest candle
    Ascending,
    /// Index 0 is the most recent candle
    Descending,
    /// Compare first and last dates: first > last means descending
    #[default]
    Infer,
}

impl SeriesOrder {
    /// Resolve `Infer` against actual data. Never returns `Infer`.
    pub fn resolve<T: OHLCV>(self, bars: &[T]) -> SeriesOrder {
        match self {
            SeriesOrder::Infer => match (bars.first(), bars.last()) {
                (Some(first), Some(last)) if first.date() > last.date() => SeriesOrder::Descending,
                _ => SeriesOrder::Ascending,
            },
            resolved => resolved,
        }
    }

    #[inline]
    pub fn is_descending(self) -> bool {
        matches!(self, SeriesOrder::Descending)
    }
}

/// Time-ascending, zero-copy view over an as-supplied candle slice.
#[derive(Debug)]
pub struct Chronological<'a, T> {
    bars: &'a [T],
    reversed: bool,
}

impl<T> Clone for Chronological<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Chronological<'_, T> {}

impl<'a, T: OHLCV> Chronological<'a, T> {
    pub fn new(bars: &'a [T], order: SeriesOrder) -> Self {
        Self {
            bars,
            reversed: order.resolve(bars).is_descending(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Resolved native order of the underlying slice
    #[inline]
    pub fn order(&self) -> SeriesOrder {
        if self.reversed {
            SeriesOrder::Descending
        } else {
            SeriesOrder::Ascending
        }
    }

    /// Candle at ascending position `pos`
    #[inline]
    pub fn get(&self, pos: usize) -> Option<&'a T> {
        if pos >= self.bars.len() {
            return None;
        }
        self.bars.get(self.original_index(pos))
    }

    /// As-supplied index of ascending position `pos`.
    /// The mapping is its own inverse.
    #[inline]
    pub fn original_index(&self, pos: usize) -> usize {
        if self.reversed {
            self.bars.len() - 1 - pos
        } else {
            pos
        }
    }

    /// Ascending position of as-supplied index `index`
    #[inline]
    pub fn position_of(&self, index: usize) -> usize {
        self.original_index(index)
    }

    /// Candles strictly after ascending position `pos`, oldest first,
    /// paired with their as-supplied index.
    pub fn after(&self, pos: usize) -> impl Iterator<Item = (usize, &'a T)> + 'a {
        let view = *self;
        (pos.saturating_add(1)..view.bars.len()).filter_map(move |p| {
            let index = view.original_index(p);
            view.bars.get(index).map(|bar| (index, bar))
        })
    }
}
