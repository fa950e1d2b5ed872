//! # fvgscan - Fair Value Gap detection
//!
//! Finds three-candle price imbalances (Fair Value Gaps) in an OHLC series
//! and tracks whether later price action has filled them.
//!
//! ## Quick Start
//!
//! ```rust
//! use fvgscan::prelude::*;
//!
//! // Newest first, as most quote APIs return history
//! let candles = vec![
//!     Candle::new("2024-01-04".to_string(), 12.0, 12.5, 9.5, 10.0, 900.0),
//!     Candle::new("2024-01-03".to_string(), 13.2, 14.0, 13.0, 13.8, 1200.0),
//!     Candle::new("2024-01-02".to_string(), 8.2, 11.0, 8.0, 10.8, 1500.0),
//!     Candle::new("2024-01-01".to_string(), 9.2, 10.0, 9.0, 9.8, 1000.0),
//! ];
//!
//! let engine = EngineBuilder::new().build().unwrap();
//! let gaps = engine.scan(&candles).unwrap();
//!
//! assert_eq!(gaps.len(), 1);
//! assert_eq!(gaps[0].id().as_str(), "bullish-2");
//! assert!(gaps[0].is_filled());
//! ```

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

pub mod detectors;
pub mod gap;
pub mod observe;
pub mod params;
pub mod series;

pub use gap::{Annotations, Gap, GapId, GapKind};
pub use series::{Chronological, SeriesOrder};

pub mod prelude {
    pub use crate::{
        // Free functions
        detect_gaps,
        detect_gaps_ordered,
        scan_gaps,
        track_fills,
        // Detectors
        detectors::{FairValueGapDetector, FillTracker, WindowScan},
        // Observability
        observe::{NoopObserver, ScanObserver, SkipReason, TracingObserver},
        // Parameters
        params::{ParamMeta, ParameterizedDetector},
        // Gaps
        Annotations,
        Gap,
        GapId,
        GapKind,
        // Data
        Candle,
        Chronological,
        OHLCVExt,
        SeriesOrder,
        OHLCV,
        // Engine
        EngineBuilder,
        GapEngine,
        Percent,
        ScanConfig,
        // Errors
        GapError,
        Result,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, GapError>;

/// Errors from configuring an engine or validating input data.
///
/// Detection itself never fails; these only surface from builder checks and
/// from the opt-in data validation in [`GapEngine::scan`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GapError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },

    #[error("Candle at index {index} breaks the series ordering")]
    UnorderedSeries { index: usize },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Non-negative, finite percentage (`0.1` means 0.1%)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percent(f64);

impl Percent {
    /// Create a new Percent, validating the value is finite and >= 0
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(GapError::InvalidValue(
                "Percent cannot be NaN or infinite",
            ));
        }
        if value < 0.0 {
            return Err(GapError::OutOfRange {
                field: "Percent",
                value,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        Ok(Self(value))
    }

    /// Coerce any value into range: NaN and negatives become 0, +inf becomes `f64::MAX`
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() || value <= 0.0 {
            Self(0.0)
        } else {
            Self(value.min(f64::MAX))
        }
    }

    /// Create a Percent from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Serialize for Percent {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Percent::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core trait for candle data
pub trait OHLCV {
    /// Ordering key: ISO date string, epoch seconds, ...
    type Date: Clone + PartialOrd + Debug;

    fn date(&self) -> Self::Date;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err(GapError::InvalidOHLCV {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Err(GapError::InvalidOHLCV {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if prices.iter().any(|&p| p < 0.0) || self.volume() < 0.0 {
            return Err(GapError::InvalidOHLCV {
                index: 0,
                reason: "negative value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(GapError::InvalidOHLCV {
                index: 0,
                reason: "high < low",
            });
        }
        let (lo, hi) = (self.low(), self.high());
        if !(lo..=hi).contains(&self.open()) || !(lo..=hi).contains(&self.close()) {
            return Err(GapError::InvalidOHLCV {
                index: 0,
                reason: "open/close outside high-low range",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// Plain candle record for callers without their own bar type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle<D = String> {
    pub date: D,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl<D> Candle<D> {
    pub fn new(date: D, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl<D: Clone + PartialOrd + Debug> OHLCV for Candle<D> {
    type Date = D;

    fn date(&self) -> D {
        self.date.clone()
    }

    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

// ============================================================
// SCAN CONFIG
// ============================================================

/// Gap count at which fill tracking moves onto the rayon pool
pub const DEFAULT_PARALLEL_FILL_MIN_GAPS: usize = 64;

/// Engine configuration. Every field has a default, so partial documents
/// deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    #[serde(flatten)]
    pub detector: detectors::FairValueGapDetector,
    /// Native ordering of input series
    pub order: SeriesOrder,
    /// Check every candle and the date ordering before scanning
    pub validate_data: bool,
    /// Track fills in parallel once this many gaps exist; `None` keeps it sequential
    pub parallel_fill_min_gaps: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            detector: detectors::FairValueGapDetector::default(),
            order: SeriesOrder::Infer,
            validate_data: false,
            parallel_fill_min_gaps: Some(DEFAULT_PARALLEL_FILL_MIN_GAPS),
        }
    }
}

impl ScanConfig {
    fn validate(&self) -> Result<()> {
        if self.parallel_fill_min_gaps == Some(0) {
            return Err(GapError::InvalidConfig(
                "parallel_fill_min_gaps must be > 0".to_string(),
            ));
        }
        // Percent fields may have been built with new_const
        Percent::new(self.detector.min_gap_size_pct.get())?;
        Percent::new(self.detector.min_candle_size_pct.get())?;
        Ok(())
    }
}

// ============================================================
// GAP ENGINE
// ============================================================

/// Runs the scanner and fill tracker with a fixed configuration
#[derive(Debug, Clone)]
pub struct GapEngine<O: observe::ScanObserver = observe::TracingObserver> {
    config: ScanConfig,
    observer: O,
}

impl<O: observe::ScanObserver> GapEngine<O> {
    #[inline]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    #[inline]
    pub fn detector(&self) -> &detectors::FairValueGapDetector {
        &self.config.detector
    }

    #[inline]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Chronological view of `bars` under the configured ordering
    #[inline]
    pub fn view<'a, T: OHLCV>(&self, bars: &'a [T]) -> Chronological<'a, T> {
        Chronological::new(bars, self.config.order)
    }

    /// Scanner phase only: every gap comes back unfilled.
    pub fn detect<T: OHLCV>(&self, bars: &[T]) -> Vec<Gap<T::Date>> {
        let view = self.view(bars);
        self.observer.on_scan_start(bars.len(), view.order());
        self.config.detector.scan(&view, &self.observer)
    }

    /// Fill-tracker phase only. Returns the number of gaps newly filled.
    pub fn track_fills<T>(&self, bars: &[T], gaps: &mut [Gap<T::Date>]) -> usize
    where
        T: OHLCV + Sync,
        T::Date: Send,
    {
        let view = self.view(bars);
        match self.config.parallel_fill_min_gaps {
            Some(min) if gaps.len() >= min => {
                detectors::FillTracker::track_parallel(&view, gaps, &self.observer)
            }
            _ => detectors::FillTracker::track(&view, gaps, &self.observer),
        }
    }

    /// Full run: optional validation, detection, then fill tracking.
    ///
    /// With `validate_data` off (the default) this never returns an error.
    pub fn scan<T>(&self, bars: &[T]) -> Result<Vec<Gap<T::Date>>>
    where
        T: OHLCV + Sync,
        T::Date: Send,
    {
        if self.config.validate_data {
            self.validate_bars(bars)?;
        }

        let mut gaps = self.detect(bars);
        self.track_fills(bars, &mut gaps);
        let filled = gaps.iter().filter(|g| g.is_filled()).count();
        self.observer.on_scan_complete(gaps.len(), filled);
        Ok(gaps)
    }

    fn validate_bars<T: OHLCV>(&self, bars: &[T]) -> Result<()> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                GapError::InvalidOHLCV { reason, .. } => GapError::InvalidOHLCV { index: i, reason },
                other => other,
            })?;
        }

        let descending = self.config.order.resolve(bars).is_descending();
        for (i, pair) in bars.windows(2).enumerate() {
            let (prev, next) = (pair[0].date(), pair[1].date());
            let ordered = if descending { prev > next } else { prev < next };
            if !ordered {
                return Err(GapError::UnorderedSeries { index: i + 1 });
            }
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating GapEngine instances
pub struct EngineBuilder<O: observe::ScanObserver = observe::TracingObserver> {
    config: ScanConfig,
    min_gap_size_pct: Option<f64>,
    min_candle_size_pct: Option<f64>,
    observer: O,
}

impl Default for EngineBuilder<observe::TracingObserver> {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder<observe::TracingObserver> {
    pub fn new() -> Self {
        Self::from_config(ScanConfig::default())
    }

    /// Start from a loaded configuration
    pub fn from_config(config: ScanConfig) -> Self {
        Self {
            config,
            min_gap_size_pct: None,
            min_candle_size_pct: None,
            observer: observe::TracingObserver,
        }
    }
}

impl<O: observe::ScanObserver> EngineBuilder<O> {
    /// Replace the observer
    pub fn observer<O2: observe::ScanObserver>(self, observer: O2) -> EngineBuilder<O2> {
        EngineBuilder {
            config: self.config,
            min_gap_size_pct: self.min_gap_size_pct,
            min_candle_size_pct: self.min_candle_size_pct,
            observer,
        }
    }

    /// Minimum gap height, percent of average price (default 0.1)
    pub fn min_gap_size_pct(mut self, pct: f64) -> Self {
        self.min_gap_size_pct = Some(pct);
        self
    }

    /// Minimum middle-candle range or body, percent of average price (default 0.2)
    pub fn min_candle_size_pct(mut self, pct: f64) -> Self {
        self.min_candle_size_pct = Some(pct);
        self
    }

    /// Use a fully configured detector
    pub fn detector(mut self, detector: detectors::FairValueGapDetector) -> Self {
        self.config.detector = detector;
        self.min_gap_size_pct = None;
        self.min_candle_size_pct = None;
        self
    }

    /// Declare the native ordering of input series
    pub fn order(mut self, order: SeriesOrder) -> Self {
        self.config.order = order;
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Parallel fill tracking from `min_gaps` gaps upward
    pub fn parallel_fills(mut self, min_gaps: usize) -> Self {
        self.config.parallel_fill_min_gaps = Some(min_gaps);
        self
    }

    /// Always track fills on the calling thread
    pub fn sequential_fills(mut self) -> Self {
        self.config.parallel_fill_min_gaps = None;
        self
    }

    /// Build the engine
    pub fn build(mut self) -> Result<GapEngine<O>> {
        if let Some(pct) = self.min_gap_size_pct {
            self.config.detector.min_gap_size_pct = Percent::new(pct)?;
        }
        if let Some(pct) = self.min_candle_size_pct {
            self.config.detector.min_candle_size_pct = Percent::new(pct)?;
        }
        self.config.validate()?;
        Ok(GapEngine {
            config: self.config,
            observer: self.observer,
        })
    }
}

// ============================================================
// FREE FUNCTIONS
// ============================================================

/// Scanner phase with explicit thresholds and inferred ordering.
///
/// Returns unfilled gaps; fewer than three candles yields an empty list.
/// Thresholds are expected to be `>= 0`; NaN or negative values are treated
/// as 0. Pair with `track_fills(bars, SeriesOrder::Infer, ..)`.
pub fn detect_gaps<T: OHLCV>(
    bars: &[T],
    min_gap_size_pct: f64,
    min_candle_size_pct: f64,
) -> Vec<Gap<T::Date>> {
    detect_gaps_ordered(bars, SeriesOrder::Infer, min_gap_size_pct, min_candle_size_pct)
}

/// [`detect_gaps`] over `bars` in a declared native order.
///
/// Pass the same `order` to [`track_fills`] so both phases agree on which
/// way time runs.
pub fn detect_gaps_ordered<T: OHLCV>(
    bars: &[T],
    order: SeriesOrder,
    min_gap_size_pct: f64,
    min_candle_size_pct: f64,
) -> Vec<Gap<T::Date>> {
    let detector = detectors::FairValueGapDetector {
        min_gap_size_pct: Percent::clamped(min_gap_size_pct),
        min_candle_size_pct: Percent::clamped(min_candle_size_pct),
    };
    let view = Chronological::new(bars, order);
    detector.scan(&view, &observe::NoopObserver)
}

/// Fill-tracker phase over `bars` in the given native order; use the order
/// the gaps were detected under. Returns the number of gaps newly filled.
pub fn track_fills<T: OHLCV>(bars: &[T], order: SeriesOrder, gaps: &mut [Gap<T::Date>]) -> usize {
    let view = Chronological::new(bars, order);
    detectors::FillTracker::track(&view, gaps, &observe::NoopObserver)
}

/// Detection and fill tracking with default thresholds and inferred ordering
pub fn scan_gaps<T: OHLCV>(bars: &[T]) -> Vec<Gap<T::Date>> {
    let mut gaps = detect_gaps(
        bars,
        detectors::DEFAULT_MIN_GAP_SIZE_PCT,
        detectors::DEFAULT_MIN_CANDLE_SIZE_PCT,
    );
    track_fills(bars, SeriesOrder::Infer, &mut gaps);
    gaps
}

// ============================================================
// TESTS
// ============================================================
