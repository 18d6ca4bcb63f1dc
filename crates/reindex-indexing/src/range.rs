//! Sync window resolution.
//!
//! A full resync always covers the past year and ignores explicit bounds.
//! An incremental sync honors `--start-time` / `--end-time`, defaulting to
//! the last 12 hours.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use reindex_types::{parse_timestamp, ConfigError, SyncWindow};

/// Lookback of a full resync, in days.
pub const FULL_RESYNC_LOOKBACK_DAYS: i64 = 365;

/// Default lookback of an incremental sync, in hours.
pub const INCREMENTAL_LOOKBACK_HOURS: i64 = 12;

pub const START_TIME_FLAG: &str = "start-time";
pub const END_TIME_FLAG: &str = "end-time";

/// Resolve the window against the current time.
pub fn resolve_window(
    start: Option<&str>,
    end: Option<&str>,
    incremental: bool,
) -> Result<SyncWindow, ConfigError> {
    resolve_window_at(Utc::now(), start, end, incremental)
}

/// Resolve the window against `now`.
pub fn resolve_window_at(
    now: DateTime<Utc>,
    start: Option<&str>,
    end: Option<&str>,
    incremental: bool,
) -> Result<SyncWindow, ConfigError> {
    if !incremental {
        if start.is_some() || end.is_some() {
            warn!("Explicit time bounds are ignored for a full resync");
        }
        return SyncWindow::new(now - Duration::days(FULL_RESYNC_LOOKBACK_DAYS), now);
    }

    let start = match start {
        Some(raw) => parse_timestamp(START_TIME_FLAG, raw)?,
        None => now - Duration::hours(INCREMENTAL_LOOKBACK_HOURS),
    };
    let end = match end {
        Some(raw) => parse_timestamp(END_TIME_FLAG, raw)?,
        None => now,
    };

    let window = SyncWindow::new(start, end)?;
    debug!(window = %window, "Resolved incremental window");
    Ok(window)
}
