//! A scheduling period and the busy blocks recorded inside it.

use std::fmt::{self, Display};

use crate::range::TimeRange;
use crate::Timestamp;

mod blocks;
pub use blocks::BlockList;


/// A span of schedulable time and the coalesced set of busy blocks within
/// it.
///
/// Invariants, re-established by every mutation:
/// 1. every block is valid and lies inside the period;
/// 2. blocks are pairwise non-overlapping and non-touching (nothing can be
///    merged further);
/// 3. blocks ascend strictly by start.
///
/// The only mutation is [`insert`](Schedule::insert); a block that misses
/// the period entirely is rejected and everything else is clipped to the
/// period and merged in. Gap queries walk the block list for the earliest
/// uncovered stretch of the period.
///
/// # Examples
///
/// ```
/// use openslot::{Schedule, TimeRange};
///
/// let mut schedule = Schedule::new(TimeRange::bounded(0, 999));
/// assert!(schedule.insert(TimeRange::bounded(0, 99)));
/// assert!(schedule.insert(TimeRange::bounded(100, 199)));
/// assert_eq!(schedule.block_count(), 1); // touching blocks merge
/// assert_eq!(schedule.next_open_gap(), Some(TimeRange::bounded(200, 999)));
/// ```
#[derive(Debug, Clone)]
pub struct Schedule {
    period: TimeRange,
    blocks: BlockList,
    last_error: Option<String>,
}

impl Schedule {
    /// Creates an empty schedule over the given period.
    pub fn new(period: TimeRange) -> Schedule {
        Schedule {
            period,
            blocks: BlockList::new(),
            last_error: None,
        }
    }

    /// Reassembles a schedule from already-vetted parts, taking the blocks
    /// as-is with no re-validation or re-coalescing.
    ///
    /// The caller asserts that the blocks satisfy the schedule invariants;
    /// debug builds check them.
    pub fn from_parts(period: TimeRange, blocks: Vec<TimeRange>) -> Schedule {
        debug_assert!(
            blocks.iter().all(|b| period.encloses(b)),
            "Schedule::from_parts called with a block outside the period"
        );
        Schedule {
            period,
            blocks: BlockList::from_vec_unchecked(blocks),
            last_error: None,
        }
    }

    pub fn period(&self) -> &TimeRange {
        &self.period
    }

    pub fn blocks(&self) -> &BlockList {
        &self.blocks
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block_at(&self, index: usize) -> Option<&TimeRange> {
        self.blocks.get(index)
    }

    /// Description of the most recent persistence failure, if any. Set and
    /// cleared by the store, never by [`insert`](Schedule::insert).
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn set_last_error(&mut self, message: Option<String>) {
        self.last_error = message;
    }

    /// Marks as busy every instant of `block` that lies inside the period.
    ///
    /// Returns false (leaving the schedule untouched) when `block` does
    /// not overlap the period at all; otherwise the overlapping portion is
    /// absorbed into the block list and the call succeeds. Absorbing time
    /// that is already busy is a success, not an error.
    pub fn insert(&mut self, block: TimeRange) -> bool {
        let clipped = block.clip_to(&self.period);
        if !clipped.is_valid() {
            return false;
        }
        self.blocks.insert(clipped);
        true
    }

    /// Returns true when the busy blocks cover the entire period: a single
    /// block equal to the period bound-for-bound.
    pub fn is_full(&self) -> bool {
        self.blocks.len() == 1 && self.blocks[0] == self.period
    }

    /// The earliest stretch of the period not covered by any busy block.
    ///
    /// An empty schedule returns the whole period. Returns `None` only
    /// when the schedule [`is_full`](Schedule::is_full).
    pub fn next_open_gap(&self) -> Option<TimeRange> {
        let first = match self.blocks.first() {
            None => return Some(self.period),
            Some(first) => first,
        };
        if let Some(gap) = self.period.gap_before(first) {
            return Some(gap);
        }
        for pair in self.blocks.windows(2) {
            if !pair[0].is_contiguous(&pair[1]) {
                // interior blocks are disjoint, so both bounds exist
                let (Some(end), Some(start)) = (pair[0].end(), pair[1].start()) else {
                    continue;
                };
                return Some(TimeRange::bounded(end + 1, start - 1));
            }
        }
        self.period.gap_after(self.blocks.last()?)
    }

    /// Like [`next_open_gap`](Schedule::next_open_gap), but the gap must
    /// end before `cutoff`.
    ///
    /// A cutoff at or past the end of an upper-bounded period is clamped
    /// to just after the period, so everything still open qualifies; a
    /// cutoff before the period entirely finds nothing. The returned gap
    /// is truncated to end no later than `cutoff - 1`.
    pub fn next_open_gap_before(&self, cutoff: Timestamp) -> Option<TimeRange> {
        if self.is_full() {
            return None;
        }
        let mut cutoff = cutoff;
        if !self.period.contains_instant(cutoff) {
            let period_end = self.period.end()?;
            if cutoff < period_end {
                return None;
            }
            cutoff = period_end + 1;
        }
        // Gaps ascend, so if the earliest one holds nothing before the
        // cutoff, none does.
        let gap = self.next_open_gap()?;
        let clipped = gap.clip_to(&TimeRange::until_end(cutoff - 1));
        clipped.is_valid().then_some(clipped)
    }
}

impl Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "schedule {{")?;
        writeln!(f, "  period: {}", self.period)?;
        writeln!(f, "  blocks: {}", self.blocks.len())?;
        for (i, block) in self.blocks.iter().enumerate() {
            writeln!(f, "    {i} : {block}")?;
        }
        writeln!(
            f,
            "  last error: {}",
            self.last_error.as_deref().unwrap_or("<none>")
        )?;
        write!(f, "}}")
    }
}
