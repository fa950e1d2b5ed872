//! Gap records produced by a detection run.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::GapError;

// ============================================================
// GAP KIND / ID
// ============================================================

/// Direction of the price imbalance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    /// Price gapped upward: `c1.high < c3.low`
    Bullish,
    /// Price gapped downward: `c1.low > c3.high`
    Bearish,
}

impl GapKind {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            GapKind::Bullish => "bullish",
            GapKind::Bearish => "bearish",
        }
    }

    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, GapKind::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, GapKind::Bearish)
    }
}

impl fmt::Display for GapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a gap, unique within one detection run (`"bullish-12"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GapId(String);

impl GapId {
    pub fn new(kind: GapKind, origin_index: usize) -> Self {
        Self(format!("{}-{}", kind.as_str(), origin_index))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================
// GAP
// ============================================================

/// A detected Fair Value Gap.
///
/// The geometry (`kind`, bounds, origin) is fixed when the scanner creates
/// the gap. Only the fill state changes afterwards, and only from unfilled
/// to filled.
///
/// Deserialization re-checks what the scanner guarantees: the bounds are
/// ordered, the id matches kind and origin, and a fill date is present
/// exactly when the gap is filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GapRepr<D>", bound(deserialize = "D: Deserialize<'de>"))]
pub struct Gap<D> {
    id: GapId,
    kind: GapKind,
    origin_index: usize,
    origin_date: D,
    upper_bound: f64,
    lower_bound: f64,
    filled: bool,
    filled_date: Option<D>,
}

impl<D> Gap<D> {
    pub(crate) fn new(
        kind: GapKind,
        origin_index: usize,
        origin_date: D,
        upper_bound: f64,
        lower_bound: f64,
    ) -> Self {
        Self {
            id: GapId::new(kind, origin_index),
            kind,
            origin_index,
            origin_date,
            upper_bound,
            lower_bound,
            filled: false,
            filled_date: None,
        }
    }

    #[inline]
    pub fn id(&self) -> &GapId {
        &self.id
    }

    #[inline]
    pub fn kind(&self) -> GapKind {
        self.kind
    }

    /// Index of the middle candle in the caller's original ordering
    #[inline]
    pub fn origin_index(&self) -> usize {
        self.origin_index
    }

    #[inline]
    pub fn origin_date(&self) -> &D {
        &self.origin_date
    }

    #[inline]
    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    #[inline]
    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    #[inline]
    pub fn is_filled(&self) -> bool {
        self.filled
    }

    #[inline]
    pub fn filled_date(&self) -> Option<&D> {
        self.filled_date.as_ref()
    }

    /// Vertical extent of the gap
    #[inline]
    pub fn size(&self) -> f64 {
        self.upper_bound - self.lower_bound
    }

    /// True if `price` lies inside the gap, bounds included
    #[inline]
    pub fn contains(&self, price: f64) -> bool {
        price >= self.lower_bound && price <= self.upper_bound
    }

    /// Mark filled at `date`. Returns false (and keeps the first fill date)
    /// if the gap was already filled.
    pub(crate) fn mark_filled(&mut self, date: D) -> bool {
        if self.filled {
            return false;
        }
        self.filled = true;
        self.filled_date = Some(date);
        true
    }
}

/// Unchecked wire form of [`Gap`]
#[derive(Deserialize)]
struct GapRepr<D> {
    id: GapId,
    kind: GapKind,
    origin_index: usize,
    origin_date: D,
    upper_bound: f64,
    lower_bound: f64,
    filled: bool,
    filled_date: Option<D>,
}

impl<D> TryFrom<GapRepr<D>> for Gap<D> {
    type Error = GapError;

    fn try_from(repr: GapRepr<D>) -> Result<Self, GapError> {
        if !(repr.upper_bound > repr.lower_bound) {
            return Err(GapError::InvalidValue("gap upper_bound must exceed lower_bound"));
        }
        if repr.filled != repr.filled_date.is_some() {
            return Err(GapError::InvalidValue("gap filled_date must be set exactly when filled"));
        }
        if repr.id != GapId::new(repr.kind, repr.origin_index) {
            return Err(GapError::InvalidValue("gap id does not match kind and origin_index"));
        }
        Ok(Self {
            id: repr.id,
            kind: repr.kind,
            origin_index: repr.origin_index,
            origin_date: repr.origin_date,
            upper_bound: repr.upper_bound,
            lower_bound: repr.lower_bound,
            filled: repr.filled,
            filled_date: repr.filled_date,
        })
    }
}

// ============================================================
// ANNOTATIONS
// ============================================================

/// Caller-owned metadata keyed by gap id.
///
/// Detection never reads this table; it exists so presentation data
/// (indicator id, colour, ...) can travel with gaps without being part of
/// [`Gap`].
#[derive(Debug, Clone)]
pub struct Annotations<M> {
    entries: HashMap<GapId, M>,
}

impl<M> Default for Annotations<M> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<M> Annotations<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach metadata to a gap, returning any previous value
    pub fn attach<D>(&mut self, gap: &Gap<D>, meta: M) -> Option<M> {
        self.entries.insert(gap.id().clone(), meta)
    }

    /// Attach the same metadata to every gap in `gaps`
    pub fn attach_all<D>(&mut self, gaps: &[Gap<D>], meta: M)
    where
        M: Clone,
    {
        for gap in gaps {
            self.attach(gap, meta.clone());
        }
    }

    pub fn get<D>(&self, gap: &Gap<D>) -> Option<&M> {
        self.entries.get(gap.id())
    }

    pub fn get_by_id(&self, id: &GapId) -> Option<&M> {
        self.entries.get(id)
    }

    pub fn remove<D>(&mut self, gap: &Gap<D>) -> Option<M> {
        self.entries.remove(gap.id())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pair every gap with its metadata, if any
    pub fn zip<'a, D>(
        &'a self,
        gaps: &'a [Gap<D>],
    ) -> impl Iterator<Item = (&'a Gap<D>, Option<&'a M>)> + 'a {
        gaps.iter().map(move |gap| (gap, self.entries.get(gap.id())))
    }
}
