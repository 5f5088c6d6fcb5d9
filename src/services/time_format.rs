//! Elapsed-time and relative-timestamp formatting
//!
//! Relative buckets are lower-inclusive, so an event exactly 60s old is
//! `1m ago`, never `60s ago`. `now` is always passed in; callers hand over
//! the cached clock snapshot so the output is stable between refreshes.

use chrono::{DateTime, Local, TimeZone, Utc};

const JUST_NOW_SECS: i64 = 5;
const MINUTE_SECS: i64 = 60;
const HOUR_SECS: i64 = 3_600;
const DAY_SECS: i64 = 86_400;

/// `MM:SS`, zero padded. Minutes are not capped at 59.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Human-relative age of `timestamp_ms` as seen from `now_ms`
pub fn relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    // Floor division; events from the future read as "just now"
    let seconds = now_ms.saturating_sub(timestamp_ms).div_euclid(1000);

    if seconds < JUST_NOW_SECS {
        return "just now".to_string();
    }
    if seconds < MINUTE_SECS {
        return format!("{seconds}s ago");
    }
    if seconds < HOUR_SECS {
        return format!("{}m ago", seconds / MINUTE_SECS);
    }
    if seconds < DAY_SECS {
        return format!("{}h ago", seconds / HOUR_SECS);
    }
    wall_clock(timestamp_ms)
}

/// Local wall-clock time `HH:MM:SS` for an epoch-ms timestamp
pub fn wall_clock(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).earliest() {
        Some(local) => local.format("%H:%M:%S").to_string(),
        None => DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
            .map(|utc| utc.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string()),
    }
}
