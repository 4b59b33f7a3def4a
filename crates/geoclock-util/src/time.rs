//! Wall-clock time utilities for geoclock
//!
//! Every clock-in, clock-out, and staleness decision reads the current time
//! through [`now`], so the whole pipeline can be shifted in development.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `GEOCLOCK_MOCK_TIME` environment variable can be set
//! to override the system time. The mock clock advances at the real rate
//! from the given starting point.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-03-10 08:55:00`)

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "GEOCLOCK_MOCK_TIME";

/// Accepted format for [`MOCK_TIME_ENV_VAR`]
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Offset between mock time and real time, computed once per process.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // Internal wrapper around Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            let raw = std::env::var(MOCK_TIME_ENV_VAR).ok()?;
            match parse_mock_time(&raw) {
                Some(mock_dt) => {
                    let offset = mock_dt.signed_duration_since(chrono::Local::now());
                    tracing::info!(
                        mock_time = %raw,
                        offset_secs = offset.num_seconds(),
                        "Mock time enabled"
                    );
                    Some(offset)
                }
                None => {
                    tracing::warn!(
                        mock_time = %raw,
                        expected_format = MOCK_TIME_FORMAT,
                        "Invalid mock time, using system time"
                    );
                    None
                }
            }
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Parse a mock time string in local time
pub fn parse_mock_time(s: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(s, MOCK_TIME_FORMAT).ok()?;
    Local.from_local_datetime(&naive).single()
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time in debug builds.
#[allow(clippy::disallowed_methods)] // The wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Parse an RFC 3339 timestamp as stored in the database
pub fn parse_timestamp(s: &str) -> Option<DateTime<Local>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Local))
}

/// `HH:MM`, used for clock-in/out columns.
pub fn format_clock_time(dt: &DateTime<Local>) -> String {
    dt.format("%H:%M").to_string()
}

/// `YYYY-MM-DD`, used for the date column of reports.
pub fn format_date(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

/// Format a DateTime for display with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format worked time as `{H}h {M}m`, flooring to whole minutes.
///
/// Negative spans (clock skew between devices) render as `0h 0m`.
pub fn format_worked_duration(d: chrono::Duration) -> String {
    let total_minutes = d.num_minutes().max(0);
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_format_clock_time() {
        let dt = Local.with_ymd_and_hms(2025, 3, 10, 8, 5, 45).unwrap();
        assert_eq!(format_clock_time(&dt), "08:05");
    }

    #[test]
    fn test_format_date() {
        let dt = Local.with_ymd_and_hms(2025, 3, 10, 8, 5, 45).unwrap();
        assert_eq!(format_date(&dt), "2025-03-10");
        assert_eq!(format_datetime_full(&dt), "2025-03-10 08:05:45");
    }

    #[test]
    fn test_format_worked_duration() {
        assert_eq!(format_worked_duration(chrono::Duration::seconds(59)), "0h 0m");
        assert_eq!(format_worked_duration(chrono::Duration::minutes(95)), "1h 35m");
        assert_eq!(
            format_worked_duration(chrono::Duration::seconds(8 * 3600 + 119)),
            "8h 1m"
        );
        assert_eq!(format_worked_duration(chrono::Duration::minutes(-5)), "0h 0m");
    }

    #[test]
    fn test_timestamp_round_trip() {
        let dt = Local.with_ymd_and_hms(2025, 3, 10, 17, 30, 0).unwrap();
        let parsed = parse_timestamp(&dt.to_rfc3339()).unwrap();
        assert_eq!(parsed, dt);
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_parse_mock_time_format() {
        let dt = parse_mock_time("2025-03-10 08:55:00").unwrap();
        assert_eq!(dt.year(), 2025);
        assert_eq!(format_clock_time(&dt), "08:55");

        assert!(parse_mock_time("2025-03-10T08:55:00").is_none());
        assert!(parse_mock_time("08:55").is_none());
    }

    #[test]
    fn test_now_returns_time() {
        let t = now();
        assert!(t.year() >= 2020);
        assert!(t.year() <= 2100);
    }
}
