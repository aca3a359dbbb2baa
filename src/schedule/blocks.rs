//! A canonical container for the busy blocks of a schedule.
//!
//! [`BlockList`] wraps a `Vec<TimeRange>` and guarantees the coalesced
//! invariant at all times: blocks are sorted ascending, every block is
//! valid, and no two blocks overlap or touch (anything that would is
//! merged on insertion).
//!
//! Read access is transparent via `Deref<Target = [TimeRange]>`; the only
//! mutation is [`BlockList::insert`], which re-establishes the invariant.

use std::fmt::{self, Display};
use std::ops::Deref;

use crate::range::TimeRange;

/// Sorted, disjoint, non-touching blocks of busy time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockList(Vec<TimeRange>);

/// Returns true if `blocks` already satisfies the coalesced invariant.
pub(crate) fn is_coalesced(blocks: &[TimeRange]) -> bool {
    blocks.iter().all(TimeRange::is_valid)
        && blocks.windows(2).all(|pair| {
            pair[0] < pair[1]
                && !pair[0].intersects(&pair[1])
                && !pair[0].is_contiguous(&pair[1])
        })
}

impl BlockList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Wraps blocks that are **already coalesced** without re-checking.
    ///
    /// Debug builds assert the invariant; in release the check is elided.
    /// Callers violating it will get incorrect results from every
    /// downstream query.
    pub fn from_vec_unchecked(blocks: Vec<TimeRange>) -> Self {
        debug_assert!(
            is_coalesced(&blocks),
            "BlockList::from_vec_unchecked called with non-coalesced input"
        );
        Self(blocks)
    }

    /// Absorbs a valid range, merging with whatever it overlaps or
    /// touches.
    ///
    /// The insertion position is found by the block ordering; the range is
    /// merged into its predecessor or successor when it intersects
    /// (union) or touches (join) it, and a merge is followed by a forward
    /// sweep re-merging adjacent pairs until none qualify, which handles a
    /// range that bridges previously separate blocks.
    pub fn insert(&mut self, range: TimeRange) {
        debug_assert!(range.is_valid());
        if self.0.is_empty() {
            self.0.push(range);
            return;
        }

        let pos = self.0.partition_point(|b| *b <= range);
        let mut merged = false;

        if pos > 0 {
            let prev = self.0[pos - 1];
            if prev.is_contiguous(&range) {
                self.0[pos - 1] = prev.join(&range);
                merged = true;
            } else if prev.intersects(&range) {
                if prev.encloses(&range) {
                    return;
                }
                self.0[pos - 1] = prev.union(&range);
                merged = true;
            }
        }
        if !merged && pos < self.0.len() {
            let next = self.0[pos];
            if next.is_contiguous(&range) {
                self.0[pos] = next.join(&range);
                merged = true;
            } else if next.intersects(&range) {
                if next.encloses(&range) {
                    return;
                }
                self.0[pos] = next.union(&range);
                merged = true;
            }
        }

        if merged {
            self.sweep();
        } else {
            self.0.insert(pos, range);
        }
    }

    // A grown block can now overlap or touch its neighbors; merge runs
    // left to right until every adjacent pair is separated.
    fn sweep(&mut self) {
        let mut i = 0;
        while i + 1 < self.0.len() {
            let (a, b) = (self.0[i], self.0[i + 1]);
            if a.is_contiguous(&b) {
                self.0[i] = a.join(&b);
                self.0.remove(i + 1);
            } else if a.intersects(&b) {
                self.0[i] = a.union(&b);
                self.0.remove(i + 1);
            } else {
                i += 1;
            }
        }
    }

    pub fn as_slice(&self) -> &[TimeRange] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<TimeRange> {
        self.0
    }
}

impl Deref for BlockList {
    type Target = [TimeRange];

    fn deref(&self) -> &[TimeRange] {
        &self.0
    }
}

impl AsRef<[TimeRange]> for BlockList {
    fn as_ref(&self) -> &[TimeRange] {
        &self.0
    }
}

impl Display for BlockList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, block) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", block)?;
        }
        write!(f, "}}")
    }
}

/// Enables `assert_eq!(block_list, vec![...])` in tests.
impl PartialEq<Vec<TimeRange>> for BlockList {
    fn eq(&self, other: &Vec<TimeRange>) -> bool {
        self.0 == *other
    }
}

impl PartialEq<BlockList> for Vec<TimeRange> {
    fn eq(&self, other: &BlockList) -> bool {
        *self == other.0
    }
}
