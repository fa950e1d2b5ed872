//! Parameter metadata for the gap detector
//!
//! Describes the tunable thresholds so callers can:
//! - sweep them in a grid search
//! - build a detector from loosely-typed key/value settings
//! - render a settings form with sane bounds
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use fvgscan::params::ParameterizedDetector;
//! use fvgscan::prelude::*;
//!
//! for param in FairValueGapDetector::param_meta() {
//!     println!("{}: default {} in {:?}", param.name, param.default, param.range);
//! }
//!
//! let mut settings = HashMap::new();
//! settings.insert("min_gap_size_pct", 0.5);
//! let detector = FairValueGapDetector::with_params(&settings).unwrap();
//! assert_eq!(detector.min_gap_size_pct.get(), 0.5);
//! ```

use std::collections::HashMap;

use crate::{GapError, Percent, Result};

// ============================================================
// PARAMETER METADATA
// ============================================================

/// Metadata for a single percentage threshold
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "min_gap_size_pct")
  pub name: &'static str,
  /// Default value, in percent
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn percent(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, default, range, description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    if step <= 0.0 || !step.is_finite() {
      return vec![min];
    }
    let mut values = Vec::new();
    let mut i = 0usize;
    loop {
      let v = min + step * i as f64;
      if v > max + f64::EPSILON {
        break;
      }
      values.push(v);
      i += 1;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value.is_nan() {
      return Err(GapError::InvalidValue("parameter cannot be NaN"));
    }
    if value < min || value > max {
      return Err(GapError::OutOfRange { field: self.name, value, min, max });
    }
    Ok(())
  }
}

// ============================================================
// PARAMETERIZED DETECTOR TRAIT
// ============================================================

/// Detectors whose thresholds can be discovered and set by name
pub trait ParameterizedDetector: Sized {
  /// Metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a detector from a key/value map.
  ///
  /// Missing parameters use their default values.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  fn detector_name() -> &'static str;
}

/// Read a percentage from params, falling back to `default`
pub fn get_percent(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Percent> {
  let value = params.get(key).copied().unwrap_or(default);
  Percent::new(value)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_param_meta_percent() {
    let meta = ParamMeta::percent("min_gap_size_pct", 0.1, (0.0, 1.0, 0.05), "Minimum gap");

    assert_eq!(meta.name, "min_gap_size_pct");
    assert_eq!(meta.default, 0.1);
    assert_eq!(meta.range.2, 0.05);
  }

  #[test]
  fn test_generate_grid() {
    let meta = ParamMeta::percent("test", 0.5, (0.3, 0.7, 0.2), "Test");

    let grid = meta.generate_grid();
    assert_eq!(grid.len(), 3);
    assert!((grid[0] - 0.3).abs() < 1e-12);
    assert!((grid[1] - 0.5).abs() < 1e-12);
    assert!((grid[2] - 0.7).abs() < 1e-12);
  }

  #[test]
  fn test_generate_grid_bad_step() {
    let meta = ParamMeta::percent("test", 0.5, (0.3, 0.7, 0.0), "Test");
    assert_eq!(meta.generate_grid(), vec![0.3]);
  }

  #[test]
  fn test_validate() {
    let meta = ParamMeta::percent("test", 0.5, (0.0, 2.0, 0.1), "Test");

    assert!(meta.validate(0.0).is_ok());
    assert!(meta.validate(2.0).is_ok());
    assert!(meta.validate(-0.1).is_err());
    assert!(meta.validate(2.1).is_err());
    assert!(meta.validate(f64::NAN).is_err());
  }

  #[test]
  fn test_get_percent_helper() {
    let mut params = HashMap::new();
    params.insert("key1", 0.8);

    assert!((get_percent(&params, "key1", 0.5).unwrap().get() - 0.8).abs() < f64::EPSILON);
    assert!((get_percent(&params, "key2", 0.5).unwrap().get() - 0.5).abs() < f64::EPSILON);

    params.insert("neg", -1.0);
    assert!(get_percent(&params, "neg", 0.5).is_err());
  }
}
