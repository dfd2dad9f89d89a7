//! ISO-8601 timestamp parsing for the freshness check.
//!
//! Accepted shapes:
//! - `2025-10-19T08:00:00[.ffffff][+HH:MM]` (also with a space separator)
//! - `2025-10-19T08:00[+HH:MM]`
//! - `2025-10-19` (midnight)
//!
//! A trailing `Z` is rewritten to `+00:00` when the value carries a time part.
//! Values without an offset are placed in `local`.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, ParseError};

const WITH_OFFSET: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse `raw`; on failure the error describes the closest attempted shape.
pub fn parse_timestamp(
    raw: &str,
    local: FixedOffset,
) -> Result<DateTime<FixedOffset>, ParseError> {
    let has_time = raw.contains('T') || raw.contains(' ');
    let normalized = match raw.strip_suffix('Z') {
        Some(head) if has_time => format!("{head}+00:00"),
        _ => raw.to_string(),
    };
    let s = normalized.as_str();

    for fmt in WITH_OFFSET {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }

    let mut last_err = None;
    for fmt in NAIVE {
        match NaiveDateTime::parse_from_str(s, fmt) {
            Ok(naive) => return Ok(place(naive, local)),
            Err(e) => {
                last_err.get_or_insert(e);
            }
        }
    }

    match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(d) => Ok(place(d.and_time(NaiveTime::default()), local)),
        Err(e) if has_time => Err(last_err.unwrap_or(e)),
        Err(e) => Err(e),
    }
}

fn place(naive: NaiveDateTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    // Fixed offsets have exactly one mapping for every local time.
    let shift = Duration::seconds(i64::from(offset.local_minus_utc()));
    let utc = naive.checked_sub_signed(shift).unwrap_or(naive);
    DateTime::from_naive_utc_and_offset(utc, offset)
}
