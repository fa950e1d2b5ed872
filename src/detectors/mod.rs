//! Fair Value Gap detectors
//!
//! - [`FairValueGapDetector`]: three-candle window scan producing [`crate::Gap`]s
//! - [`FillTracker`]: marks gaps filled by later price action
//! - [`helpers`]: threshold arithmetic shared by both

pub mod helpers;

pub mod fair_value_gap;
pub mod fill;

pub use fair_value_gap::*;
pub use fill::*;
pub use helpers::*;
