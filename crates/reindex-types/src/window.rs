//! Extraction time window.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Inclusive `[start, end]` range of source timestamps to extract.
///
/// Invariant: `start <= end`. Computed once per run and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    /// Create a window, rejecting `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::InvalidRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// Start bound in milliseconds since epoch.
    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    /// End bound in milliseconds since epoch.
    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }
}

impl std::fmt::Display for SyncWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} .. {}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Parse a user-supplied ISO 8601 timestamp for the named flag.
///
/// Accepts RFC 3339 with offset, naive date-times (taken as UTC) and plain
/// dates (midnight UTC). Empty input is a missing argument, anything else
/// unparseable is an invalid timestamp carrying the raw value.
pub fn parse_timestamp(flag: &str, raw: &str) -> Result<DateTime<Utc>, ConfigError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ConfigError::MissingArgument {
            flag: flag.to_string(),
        });
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    Err(ConfigError::InvalidTimestamp {
        flag: flag.to_string(),
        value: raw.to_string(),
    })
}
