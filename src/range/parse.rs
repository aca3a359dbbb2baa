//! Text boundary for time ranges.
//!
//! Date-times travel as compact local-zone timestamps
//! (`YYYYMMDDThhmmss±hhmm`, with progressively shorter forms accepted on
//! input) joined by `:` into a range, plus the literal forms `-` (fully
//! unbounded) and `<invalid>`. This module also provides [`justify`], the
//! local-time rounding used to align cutoffs to whole minutes, hours, or
//! days.

use std::fmt::{self, Display};

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

use super::TimeRange;
use crate::Timestamp;

pub(crate) const INVALID_MARKER: &str = "<invalid>";

const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S%z";

/// Local-time precision a timestamp can be justified to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Justify {
    Minutes,
    Hours,
    Days,
}

// Offset-less text is interpreted in the local zone; during a fall-back
// overlap the earlier mapping wins, inside a spring-forward hole the time
// is pushed past the hole.
fn local_timestamp(naive: NaiveDateTime) -> Option<Timestamp> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.timestamp()),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.timestamp()),
        LocalResult::None => Local
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.timestamp()),
    }
}

fn render(t: Timestamp) -> String {
    match Local.timestamp_opt(t, 0).single() {
        Some(dt) => dt.format(DATE_TIME_FORMAT).to_string(),
        None => t.to_string(),
    }
}

/// Parses a single date-time.
///
/// Accepts the keywords `now`, `today`, `yesterday`, and `tomorrow`
/// (case-insensitive, day keywords truncated to local midnight) and the
/// compact timestamp forms `YYYYMMDDThhmmss±hhmm`, `YYYYMMDDThhmmss`,
/// `YYYYMMDDThhmm`, and `YYYYMMDD`.
pub fn parse_datetime(text: &str) -> Option<Timestamp> {
    let text = text.trim();
    match text.to_ascii_lowercase().as_str() {
        "now" => return Some(Utc::now().timestamp()),
        "today" => return Some(justify(Utc::now().timestamp(), Justify::Days, false)),
        "yesterday" => {
            return Some(justify(Utc::now().timestamp() - 86_400, Justify::Days, false))
        }
        "tomorrow" => {
            return Some(justify(Utc::now().timestamp() + 86_400, Justify::Days, false))
        }
        _ => {}
    }
    if let Ok(dt) = DateTime::parse_from_str(text, DATE_TIME_FORMAT) {
        return Some(dt.timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y%m%dT%H%M%S") {
        return local_timestamp(naive);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y%m%dT%H%M") {
        return local_timestamp(naive);
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y%m%d") {
        return local_timestamp(date.and_hms_opt(0, 0, 0)?);
    }
    None
}

/// Truncates `t` to the given local-time precision, or rounds it up to the
/// next boundary when `round_up` is set and any finer field is non-zero
/// (10:00:03 justified up to hours becomes 11:00:00).
pub fn justify(t: Timestamp, to: Justify, round_up: bool) -> Timestamp {
    let Some(local) = Local.timestamp_opt(t, 0).single() else {
        return t;
    };
    let naive = local.naive_local();
    let truncated = match to {
        Justify::Minutes => naive.with_second(0),
        Justify::Hours => naive.with_second(0).and_then(|n| n.with_minute(0)),
        Justify::Days => naive.date().and_hms_opt(0, 0, 0),
    }
    .unwrap_or(naive);
    let adjusted = if round_up && truncated < naive {
        truncated
            + match to {
                Justify::Minutes => Duration::minutes(1),
                Justify::Hours => Duration::hours(1),
                Justify::Days => Duration::days(1),
            }
    } else {
        truncated
    };
    local_timestamp(adjusted).unwrap_or(t)
}

impl TimeRange {
    /// Parses the textual range grammar: `[<datetime>] ':' [<datetime>]`,
    /// a bare `<datetime>` (start-only range), `-` or the empty string
    /// (fully unbounded), or the invalid marker. A side that is present
    /// but unparsable yields [`TimeRange::INVALID`], as does a reversed
    /// pair of bounds.
    pub fn parse(text: &str) -> TimeRange {
        let text = text.trim();
        if text.is_empty() || text == "-" {
            return TimeRange::UNBOUNDED;
        }
        if text == INVALID_MARKER {
            return TimeRange::INVALID;
        }
        let Some((lhs, rhs)) = text.split_once(':') else {
            return match parse_datetime(text) {
                Some(start) => TimeRange::from_start(start),
                None => TimeRange::INVALID,
            };
        };
        let start = if lhs.is_empty() {
            None
        } else {
            match parse_datetime(lhs) {
                Some(t) => Some(t),
                None => return TimeRange::INVALID,
            }
        };
        let end = if rhs.is_empty() {
            None
        } else {
            match parse_datetime(rhs) {
                Some(t) => Some(t),
                None => return TimeRange::INVALID,
            }
        };
        match (start, end) {
            (Some(s), Some(e)) => TimeRange::bounded(s, e),
            (Some(s), None) => TimeRange::from_start(s),
            (None, Some(e)) => TimeRange::until_end(e),
            (None, None) => TimeRange::UNBOUNDED,
        }
    }
}

impl Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.valid {
            return f.write_str(INVALID_MARKER);
        }
        match (self.start, self.end) {
            (None, None) => f.write_str("-"),
            (Some(s), None) => write!(f, "{}:", render(s)),
            (None, Some(e)) => write!(f, ":{}", render(e)),
            (Some(s), Some(e)) => write!(f, "{}:{}", render(s), render(e)),
        }
    }
}
