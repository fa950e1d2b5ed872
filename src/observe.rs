//! Observability hooks for a detection run.
//!
//! The scanner and fill tracker report what they do through a
//! [`ScanObserver`]. The engine defaults to [`TracingObserver`], which turns
//! each event into a structured `tracing` event; use [`NoopObserver`] to
//! silence a run entirely.

use std::fmt::Debug;

use tracing::{debug, trace};

use crate::{Gap, SeriesOrder};

/// Why a window produced no gap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Middle candle range and body both below the significance threshold
    InsignificantCandle,
}

/// Receives events from a detection run. Every method defaults to a no-op.
pub trait ScanObserver: Send + Sync {
    fn on_scan_start(&self, _candles: usize, _order: SeriesOrder) {}

    /// `origin_index` is the as-supplied index of the window's middle candle
    fn on_window_skipped(&self, _origin_index: usize, _reason: SkipReason) {}

    fn on_gap_detected<D: Debug>(&self, _gap: &Gap<D>) {}

    /// `at_index` is the as-supplied index of the filling candle
    fn on_gap_filled<D: Debug>(&self, _gap: &Gap<D>, _at_index: usize) {}

    fn on_scan_complete(&self, _detected: usize, _filled: usize) {}
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}

/// Emits `tracing` events: `debug` for run lifecycle and gaps, `trace` for
/// per-window skips.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ScanObserver for TracingObserver {
    fn on_scan_start(&self, candles: usize, order: SeriesOrder) {
        debug!(candles, order = ?order, "fvg scan started");
    }

    fn on_window_skipped(&self, origin_index: usize, reason: SkipReason) {
        trace!(origin_index, reason = ?reason, "window skipped");
    }

    fn on_gap_detected<D: Debug>(&self, gap: &Gap<D>) {
        debug!(
            id = %gap.id(),
            origin_date = ?gap.origin_date(),
            upper = gap.upper_bound(),
            lower = gap.lower_bound(),
            "gap detected"
        );
    }

    fn on_gap_filled<D: Debug>(&self, gap: &Gap<D>, at_index: usize) {
        debug!(
            id = %gap.id(),
            at_index,
            filled_date = ?gap.filled_date(),
            "gap filled"
        );
    }

    fn on_scan_complete(&self, detected: usize, filled: usize) {
        debug!(detected, filled, "fvg scan complete");
    }
}
