//! `mm:ss` time parsing.
//!
//! Manifest times go through two separate checks. The first is purely
//! about shape: two runs of decimal digits around a colon. The second
//! converts the value with clock semantics, where both the minute and the
//! second field must lie in `0..=59` and use at most two digits.
//!
//! A value can therefore pass the shape check and still fail conversion
//! (`"02:75"`). [`parse_mmss`] keeps the two outcomes apart so that callers
//! can tell "not given" from "given but wrong", even though both fall back
//! to the same default.
//!
//! # Example
//!
//! ```
//! use cliptrim::{TimeSpec, parse_mmss};
//!
//! assert_eq!(parse_mmss(Some("01:30")), TimeSpec::Seconds(90));
//! assert_eq!(parse_mmss(Some("abc")), TimeSpec::Absent);
//! assert!(matches!(parse_mmss(Some("02:75")), TimeSpec::Malformed(_)));
//! ```

use std::sync::OnceLock;

use regex::Regex;

use crate::error::TrimError;

/// Largest value either clock field may hold.
const MAX_CLOCK_FIELD: u64 = 59;

/// Outcome of parsing a manifest time value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeSpec {
    /// A valid `mm:ss` value, as whole seconds.
    Seconds(u64),
    /// No value, an empty value, or something that is not shaped like `mm:ss`.
    Absent,
    /// Shaped like `mm:ss` but not a valid minutes/seconds pair.
    Malformed(String),
}

impl TimeSpec {
    /// Whole seconds, if this is a usable time.
    pub fn seconds(&self) -> Option<u64> {
        match self {
            TimeSpec::Seconds(seconds) => Some(*seconds),
            TimeSpec::Absent | TimeSpec::Malformed(_) => None,
        }
    }
}

fn shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| Regex::new(r"^([0-9]+):([0-9]+)$").expect("mm:ss pattern is valid"))
}

/// Returns `true` if `value` is two groups of decimal digits separated by a
/// single colon and nothing else.
pub fn looks_like_time_spec(value: &str) -> bool {
    shape().is_match(value)
}

/// Convert an `mm:ss` value to whole seconds.
///
/// # Errors
///
/// Returns [`TrimError::TimeConversion`] if the value is not shaped like
/// `mm:ss`, if a field has more than two digits, or if a field exceeds 59.
pub fn to_seconds(value: &str) -> Result<u64, TrimError> {
    let conversion_error = |reason: &str| TrimError::TimeConversion {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let captures = shape()
        .captures(value)
        .ok_or_else(|| conversion_error("not shaped like mm:ss"))?;

    let minutes = clock_field(&captures[1]).ok_or_else(|| conversion_error("minutes out of range"))?;
    let seconds = clock_field(&captures[2]).ok_or_else(|| conversion_error("seconds out of range"))?;

    Ok(minutes * 60 + seconds)
}

fn clock_field(digits: &str) -> Option<u64> {
    if digits.len() > 2 {
        return None;
    }
    digits.parse::<u64>().ok().filter(|&value| value <= MAX_CLOCK_FIELD)
}

/// Parse an optional manifest time value.
///
/// Missing, empty, and non-`mm:ss` values are [`TimeSpec::Absent`].
/// Values that look right but fail conversion are [`TimeSpec::Malformed`];
/// [`to_seconds`] on the same value gives the reason. Nothing is logged here
/// so that callers can report the problem against the job it belongs to.
pub fn parse_mmss(value: Option<&str>) -> TimeSpec {
    let Some(value) = value else {
        return TimeSpec::Absent;
    };

    if !looks_like_time_spec(value) {
        return TimeSpec::Absent;
    }

    match to_seconds(value) {
        Ok(seconds) => TimeSpec::Seconds(seconds),
        Err(_) => TimeSpec::Malformed(value.to_string()),
    }
}
