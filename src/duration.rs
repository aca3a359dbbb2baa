//! Duration strings for the command line.
//!
//! Accepted forms: a bare integer (seconds), an integer with a unit
//! (`90m`, `12h`, `2days`), `<day>-<hr>[:<min>[:<sec>]]`, or
//! `<hr>:<min>[:<sec>]`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,
    #[error("malformed duration `{0}`")]
    Malformed(String),
    #[error("unknown duration unit `{0}`")]
    UnknownUnit(String),
    #[error("duration must be positive")]
    NotPositive,
}

fn unit_multiplier(unit: &str) -> Option<i64> {
    const TABLE: &[(&[&str], i64)] = &[
        (&["seconds", "second", "secs", "sec", "s"], 1),
        (&["minutes", "minute", "mins", "min", "m"], 60),
        (&["hours", "hour", "hrs", "hr", "h"], 3_600),
        (&["days", "day", "d"], 86_400),
    ];
    TABLE
        .iter()
        .find(|(names, _)| names.iter().any(|n| unit.eq_ignore_ascii_case(n)))
        .map(|(_, multiplier)| *multiplier)
}

fn components(text: &str) -> Option<Vec<i64>> {
    text.split(':').map(|part| part.parse().ok()).collect()
}

/// Parses a duration string into a positive number of seconds.
pub fn parse_duration(text: &str) -> Result<i64, DurationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DurationError::Empty);
    }
    let malformed = || DurationError::Malformed(text.to_string());

    let digits = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let value: i64 = text[..digits].parse().map_err(|_| malformed())?;
    let rest = &text[digits..];

    let seconds = if rest.is_empty() {
        value
    } else if let Some(tail) = rest.strip_prefix('-') {
        // leading value counts days
        let comps = components(tail).ok_or_else(malformed)?;
        match comps.as_slice() {
            [h] => value * 86_400 + h * 3_600,
            [h, m] => value * 86_400 + h * 3_600 + m * 60,
            [h, m, s] => value * 86_400 + h * 3_600 + m * 60 + s,
            _ => return Err(malformed()),
        }
    } else if let Some(tail) = rest.strip_prefix(':') {
        // leading value counts hours
        let comps = components(tail).ok_or_else(malformed)?;
        match comps.as_slice() {
            [m] => value * 3_600 + m * 60,
            [m, s] => value * 3_600 + m * 60 + s,
            _ => return Err(malformed()),
        }
    } else {
        let multiplier =
            unit_multiplier(rest).ok_or_else(|| DurationError::UnknownUnit(rest.to_string()))?;
        value * multiplier
    };

    if seconds <= 0 {
        return Err(DurationError::NotPositive);
    }
    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_integers_are_seconds() {
        assert_eq!(parse_duration("3600"), Ok(3_600));
        assert_eq!(parse_duration(" 42 "), Ok(42));
    }

    #[test]
    fn units_scale_the_value() {
        assert_eq!(parse_duration("90s"), Ok(90));
        assert_eq!(parse_duration("90m"), Ok(5_400));
        assert_eq!(parse_duration("12h"), Ok(43_200));
        assert_eq!(parse_duration("2d"), Ok(172_800));
        assert_eq!(parse_duration("2days"), Ok(172_800));
        assert_eq!(parse_duration("3HRS"), Ok(10_800));
        assert_eq!(parse_duration("5minutes"), Ok(300));
    }

    #[test]
    fn day_hour_form() {
        assert_eq!(parse_duration("1-12"), Ok(86_400 + 12 * 3_600));
        assert_eq!(parse_duration("1-12:30"), Ok(86_400 + 12 * 3_600 + 30 * 60));
        assert_eq!(
            parse_duration("1-12:30:15"),
            Ok(86_400 + 12 * 3_600 + 30 * 60 + 15)
        );
    }

    #[test]
    fn hour_minute_form() {
        assert_eq!(parse_duration("12:30"), Ok(12 * 3_600 + 30 * 60));
        assert_eq!(parse_duration("12:30:15"), Ok(12 * 3_600 + 30 * 60 + 15));
    }

    #[test]
    fn rejects_nonsense() {
        assert_eq!(parse_duration(""), Err(DurationError::Empty));
        assert!(matches!(
            parse_duration("h12"),
            Err(DurationError::Malformed(_))
        ));
        assert!(matches!(
            parse_duration("12fortnights"),
            Err(DurationError::UnknownUnit(_))
        ));
        assert!(matches!(
            parse_duration("1-2:3:4:5"),
            Err(DurationError::Malformed(_))
        ));
        assert!(matches!(
            parse_duration("1-"),
            Err(DurationError::Malformed(_))
        ));
        assert_eq!(parse_duration("0"), Err(DurationError::NotPositive));
        assert_eq!(parse_duration("0s"), Err(DurationError::NotPositive));
    }
}
