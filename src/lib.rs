//! openslot - busy-time bookkeeping over a scheduling period
//!
//! Tracks which sub-ranges of a (possibly unbounded) span of time are
//! occupied, coalescing overlapping or touching ranges as they are added,
//! and answers "what is the next open block of time?" queries. Schedules
//! can be persisted to and restored from an SQLite file.

pub mod duration;
pub mod range;
pub mod schedule;
pub mod store;

// Re-export the core types for ergonomic use
pub use range::{Justify, TileCount, TimeRange};
pub use schedule::Schedule;

/// Signed count of seconds since the Unix epoch.
pub type Timestamp = i64;
