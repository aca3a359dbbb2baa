//! Time ranges over epoch seconds, optionally unbounded on either side.

use std::cmp::Ordering;

use crate::Timestamp;

mod parse;

pub use parse::{justify, parse_datetime, Justify};

/// Inclusive range `[start, end]` of epoch seconds where either bound may be
/// absent, making the range semi-infinite on that side.
///
/// Two sentinel values exist: [`TimeRange::INVALID`], produced by failed
/// parses and by combination operators whose preconditions do not hold, and
/// [`TimeRange::UNBOUNDED`], the range covering all of time. Every operator
/// treats an invalid operand as "no result"; callers check [`is_valid`]
/// before chaining.
///
/// # Examples
///
/// ```
/// use openslot::TimeRange;
///
/// let a = TimeRange::bounded(0, 99);
/// let b = TimeRange::bounded(50, 149);
/// assert!(a.intersects(&b));
/// assert_eq!(a.union(&b), TimeRange::bounded(0, 149));
/// assert_eq!(a.intersection(&b), TimeRange::bounded(50, 99));
/// ```
///
/// [`is_valid`]: TimeRange::is_valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    start: Option<Timestamp>,
    end: Option<Timestamp>,
    valid: bool,
}

/// Number of fixed-length tiles needed to cover a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileCount {
    Finite(u64),
    /// The range is missing a bound, so tiles can be cut from it forever.
    Unbounded,
}

impl TimeRange {
    /// The shared "no such range" sentinel.
    pub const INVALID: TimeRange = TimeRange {
        start: None,
        end: None,
        valid: false,
    };

    /// The range covering all of time.
    pub const UNBOUNDED: TimeRange = TimeRange {
        start: None,
        end: None,
        valid: true,
    };

    /// Creates `[start, end]`, or [`TimeRange::INVALID`] when `start > end`.
    pub const fn bounded(start: Timestamp, end: Timestamp) -> TimeRange {
        if start <= end {
            TimeRange {
                start: Some(start),
                end: Some(end),
                valid: true,
            }
        } else {
            Self::INVALID
        }
    }

    /// Creates `[start, +inf)`.
    pub const fn from_start(start: Timestamp) -> TimeRange {
        TimeRange {
            start: Some(start),
            end: None,
            valid: true,
        }
    }

    /// Creates `(-inf, end]`.
    pub const fn until_end(end: Timestamp) -> TimeRange {
        TimeRange {
            start: None,
            end: Some(end),
            valid: true,
        }
    }

    /// Creates the `len`-second range beginning at `start`.
    pub const fn with_duration(start: Timestamp, len: i64) -> TimeRange {
        Self::bounded(start, start + len - 1)
    }

    pub const fn start(&self) -> Option<Timestamp> {
        self.start
    }

    pub const fn end(&self) -> Option<Timestamp> {
        self.end
    }

    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    pub const fn has_start(&self) -> bool {
        self.start.is_some()
    }

    pub const fn has_end(&self) -> bool {
        self.end.is_some()
    }

    pub const fn is_fully_bounded(&self) -> bool {
        self.valid && self.start.is_some() && self.end.is_some()
    }

    /// Seconds covered by a fully bounded range (`end - start + 1`).
    pub fn duration(&self) -> Option<i64> {
        if !self.valid {
            return None;
        }
        match (self.start, self.end) {
            (Some(s), Some(e)) => Some(e - s + 1),
            _ => None,
        }
    }

    /// Returns true if `t` lies inside the range.
    pub fn contains_instant(&self, t: Timestamp) -> bool {
        if !self.valid {
            return false;
        }
        if let Some(s) = self.start {
            if t < s {
                return false;
            }
        }
        if let Some(e) = self.end {
            if t > e {
                return false;
            }
        }
        true
    }

    /// Returns true if every instant of `inner` lies inside `self`.
    ///
    /// A bound `self` lacks constrains nothing; a bound `self` has that
    /// `inner` lacks can never be satisfied.
    pub fn encloses(&self, inner: &TimeRange) -> bool {
        if !self.valid || !inner.valid {
            return false;
        }
        if let Some(s) = self.start {
            match inner.start {
                Some(is) if is >= s => {}
                _ => return false,
            }
        }
        if let Some(e) = self.end {
            match inner.end {
                Some(ie) if ie <= e => {}
                _ => return false,
            }
        }
        true
    }

    /// Returns true if the two ranges share at least one instant.
    pub fn intersects(&self, other: &TimeRange) -> bool {
        if !self.valid || !other.valid {
            return false;
        }
        let self_starts_in_time = match (self.start, other.end) {
            (Some(s), Some(e)) => s <= e,
            _ => true,
        };
        let other_starts_in_time = match (other.start, self.end) {
            (Some(s), Some(e)) => s <= e,
            _ => true,
        };
        self_starts_in_time && other_starts_in_time
    }

    /// Returns true if one range ends exactly one second before the other
    /// begins. Requires both touching bounds to exist; never true for
    /// ranges open on the touching side.
    pub fn is_contiguous(&self, other: &TimeRange) -> bool {
        if !self.valid || !other.valid {
            return false;
        }
        if let (Some(e), Some(s)) = (self.end, other.start) {
            if e + 1 == s {
                return true;
            }
        }
        if let (Some(e), Some(s)) = (other.end, self.start) {
            if e + 1 == s {
                return true;
            }
        }
        false
    }

    /// The overlap of the two ranges, or [`TimeRange::INVALID`] when they
    /// are disjoint. A side of the result is bounded when either input
    /// bounds it (latest start, earliest end).
    pub fn intersection(&self, other: &TimeRange) -> TimeRange {
        if !self.intersects(other) {
            return Self::INVALID;
        }
        let start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        TimeRange { start, end, valid: true }
    }

    // Span covering both ranges. A side stays bounded only when both
    // inputs bound it.
    fn spanning(&self, other: &TimeRange) -> TimeRange {
        let start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(a.min(b)),
            _ => None,
        };
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        };
        TimeRange { start, end, valid: true }
    }

    /// The span covering two intersecting ranges, or
    /// [`TimeRange::INVALID`] when they are disjoint. A side of the result
    /// is bounded only when both inputs are bounded on that side.
    pub fn union(&self, other: &TimeRange) -> TimeRange {
        if !self.intersects(other) {
            return Self::INVALID;
        }
        self.spanning(other)
    }

    /// Like [`union`](TimeRange::union) but for contiguous rather than
    /// intersecting ranges.
    pub fn join(&self, other: &TimeRange) -> TimeRange {
        if !self.is_contiguous(other) {
            return Self::INVALID;
        }
        self.spanning(other)
    }

    /// `self` with each bound tightened to `bounds`'s corresponding bound
    /// where the latter is tighter; [`TimeRange::INVALID`] when the two do
    /// not intersect. A bound absent on `bounds` never widens `self`.
    pub fn clip_to(&self, bounds: &TimeRange) -> TimeRange {
        self.intersection(bounds)
    }

    /// The portion of `self` strictly before `inner`'s start.
    ///
    /// `None` unless the two intersect and `self` actually extends ahead
    /// of `inner` on that side.
    pub fn gap_before(&self, inner: &TimeRange) -> Option<TimeRange> {
        if !self.intersects(inner) {
            return None;
        }
        let inner_start = inner.start?;
        match self.start {
            Some(s) if s < inner_start => Some(Self::bounded(s, inner_start - 1)),
            Some(_) => None,
            None => Some(Self::until_end(inner_start - 1)),
        }
    }

    /// The portion of `self` strictly after `inner`'s end.
    pub fn gap_after(&self, inner: &TimeRange) -> Option<TimeRange> {
        if !self.intersects(inner) {
            return None;
        }
        let inner_end = inner.end?;
        match self.end {
            Some(e) if e > inner_end => Some(Self::bounded(inner_end + 1, e)),
            Some(_) => None,
            None => Some(Self::from_start(inner_end + 1)),
        }
    }

    /// The portion of `self` strictly before `cutoff`; `None` unless
    /// `cutoff` lies inside `self` and something precedes it.
    pub fn before_instant(&self, cutoff: Timestamp) -> Option<TimeRange> {
        if !self.contains_instant(cutoff) {
            return None;
        }
        match self.start {
            Some(s) if s < cutoff => Some(Self::bounded(s, cutoff - 1)),
            Some(_) => None,
            None => Some(Self::until_end(cutoff - 1)),
        }
    }

    /// The portion of `self` strictly after `cutoff`; `None` unless
    /// `cutoff` lies inside `self` and something follows it.
    pub fn after_instant(&self, cutoff: Timestamp) -> Option<TimeRange> {
        if !self.contains_instant(cutoff) {
            return None;
        }
        match self.end {
            Some(e) if e > cutoff => Some(Self::bounded(cutoff + 1, e)),
            Some(_) => None,
            None => Some(Self::from_start(cutoff + 1)),
        }
    }

    /// Number of `len`-second tiles needed to cover the range; the last
    /// tile may be short. Ranges missing a bound tile forever.
    pub fn tile_count(&self, len: i64) -> TileCount {
        debug_assert!(len > 0, "tile length must be positive");
        if !self.valid {
            return TileCount::Finite(0);
        }
        match (self.start, self.end) {
            (Some(s), Some(e)) => {
                let span = (e - s + 1) as u64;
                let len = len as u64;
                TileCount::Finite(span / len + u64::from(span % len != 0))
            }
            _ => TileCount::Unbounded,
        }
    }

    /// The `index`-th `len`-second tile of the range.
    ///
    /// With a start bound, tile 0 begins at `start` and tiles walk
    /// forward, the last one truncated at `end`; `None` once the tile
    /// would begin past `end`. With only an end bound, tile 0 ends at
    /// `end` and tiles walk backward. A range with no bounds at all has
    /// no anchor to tile from.
    ///
    /// # Examples
    ///
    /// ```
    /// use openslot::TimeRange;
    ///
    /// let r = TimeRange::bounded(0, 249);
    /// assert_eq!(r.tile_at(100, 0), Some(TimeRange::bounded(0, 99)));
    /// assert_eq!(r.tile_at(100, 2), Some(TimeRange::bounded(200, 249)));
    /// assert_eq!(r.tile_at(100, 3), None);
    /// ```
    pub fn tile_at(&self, len: i64, index: u64) -> Option<TimeRange> {
        debug_assert!(len > 0, "tile length must be positive");
        if !self.valid {
            return None;
        }
        let offset = len * index as i64;
        match (self.start, self.end) {
            (Some(s), Some(e)) => {
                let tile_start = s + offset;
                if tile_start > e {
                    return None;
                }
                Some(Self::bounded(tile_start, (tile_start + len - 1).min(e)))
            }
            (Some(s), None) => {
                let tile_start = s + offset;
                Some(Self::bounded(tile_start, tile_start + len - 1))
            }
            (None, Some(e)) => Some(Self::bounded(e - offset - len + 1, e - offset)),
            (None, None) => None,
        }
    }
}

/// Invalid ranges sort before all valid ones (two invalids are equal).
/// Valid ranges ascend by start, an absent start sorting earliest; ties
/// ascend by end, an absent end sorting latest. Ordered block insertion
/// and gap discovery both rely on exactly this order.
impl Ord for TimeRange {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.valid, other.valid) {
            (false, false) => return Ordering::Equal,
            (false, true) => return Ordering::Less,
            (true, false) => return Ordering::Greater,
            (true, true) => {}
        }
        let by_start = match (self.start, other.start) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(&b),
        };
        if by_start != Ordering::Equal {
            return by_start;
        }
        match (self.end, other.end) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(&b),
        }
    }
}

impl PartialOrd for TimeRange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// =============================================================================
// TimeRange Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl serde::Serialize for TimeRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for TimeRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        let range = TimeRange::parse(&text);
        if !range.is_valid() && text != parse::INVALID_MARKER {
            return Err(serde::de::Error::custom(format!(
                "malformed time range `{text}`"
            )));
        }
        Ok(range)
    }
}
