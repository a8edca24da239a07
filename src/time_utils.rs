// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Conversions between source-local wall-clock times and UTC instants.
//!
//! Both platforms report naive local times. They are turned into
//! `DateTime<Utc>` as soon as they are ingested; nothing downstream ever
//! compares wall-clock values.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Formats accepted for source-local timestamps.
const LOCAL_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Errors from timestamp normalization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("Unparseable local timestamp: {0:?}")]
    Unparseable(String),

    #[error("Local time {local} does not exist in {zone}")]
    NonExistent { local: NaiveDateTime, zone: Tz },
}

/// Parse a source-local ISO-8601 timestamp.
///
/// Strava suffixes `start_date_local` with `Z` even though the value is
/// local wall-clock time, so a trailing `Z` is ignored.
pub fn parse_local(raw: &str) -> Result<NaiveDateTime, TimeError> {
    let trimmed = raw.trim().trim_end_matches('Z');
    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| TimeError::Unparseable(raw.to_string()))
}

/// Interpret a wall-clock time in `zone` and return the absolute instant.
///
/// During the autumn DST overlap the earlier instant is chosen. Times in
/// the spring gap do not exist and are rejected.
pub fn localize(local: NaiveDateTime, zone: Tz) -> Result<DateTime<Utc>, TimeError> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(TimeError::NonExistent { local, zone }),
    }
}

/// Parse and localize in one step.
pub fn parse_in_zone(raw: &str, zone: Tz) -> Result<DateTime<Utc>, TimeError> {
    localize(parse_local(raw)?, zone)
}

/// Wall-clock time of `instant` in `zone`.
pub fn to_local(instant: DateTime<Utc>, zone: Tz) -> NaiveDateTime {
    instant.with_timezone(&zone).naive_local()
}
