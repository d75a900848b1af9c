//! Shared utilities for CLI commands.

use std::fs::{self, File};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Context;
use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use fs2::FileExt;
use regex::Regex;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").unwrap());

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Parse a datetime string as either RFC 3339 or relative time.
///
/// Supports:
/// - RFC 3339: "2026-01-15T10:30:00Z"
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
pub fn parse_datetime(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use RFC 3339 (e.g., 2026-01-15T10:30:00Z) or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(Utc::now() - Duration::minutes(n * minutes_per_unit))
}

/// Which end of a range a user-supplied bound is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

/// Parses a range bound. A bare `YYYY-MM-DD` date means local midnight for
/// [`Bound::Start`] and the last millisecond of that local day for
/// [`Bound::End`]; anything else goes through [`parse_datetime`].
pub fn parse_bound(s: &str, bound: Bound) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
        return Ok(match bound {
            Bound::Start => local_midnight_to_utc(date),
            Bound::End => {
                local_midnight_to_utc(date + Duration::days(1)) - Duration::milliseconds(1)
            }
        });
    }
    parse_datetime(s)
}

/// Parses an optional bound, naming the flag in the error.
pub fn parse_optional_bound(
    s: Option<&str>,
    bound: Bound,
    flag: &str,
) -> anyhow::Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_bound(s, bound).with_context(|| format!("invalid --{flag}")))
        .transpose()
}

/// Converts a local date at midnight to UTC.
/// Handles DST ambiguity by picking the earlier time.
pub fn local_midnight_to_utc(local_date: NaiveDate) -> DateTime<Utc> {
    let midnight = local_date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        // Midnight skipped by a DST change; 1am local exists.
        LocalResult::None => Local
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest()
            .map_or_else(|| midnight.and_utc(), |dt| dt.with_timezone(&Utc)),
    }
}

/// Formats seconds as a duration string.
/// Returns "Xh Ym" if >= 1 hour, "Xm" if >= 1 minute, "Xs" otherwise.
/// Negative durations are treated as 0s.
pub fn format_duration(secs: i64) -> String {
    if secs <= 0 {
        return "0s".to_string();
    }
    let total_minutes = secs / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else if total_minutes >= 1 {
        format!("{minutes}m")
    } else {
        format!("{secs}s")
    }
}

/// Formats a ratio in `[0, 1]` as a whole percentage.
#[allow(clippy::cast_possible_truncation)]
pub fn format_percent(ratio: f64) -> String {
    format!("{}%", (ratio * 100.0).round() as i64)
}

/// Takes the exclusive store lock that serializes ingest across processes.
///
/// The lock lives next to the database and is released when the returned
/// file is dropped.
pub fn lock_store(database_path: &Path) -> anyhow::Result<File> {
    let lock_path = database_path.with_extension("lock");
    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    let lock_file = File::create(&lock_path).context("failed to create lock file")?;
    lock_file
        .lock_exclusive()
        .context("failed to acquire lock")?;
    Ok(lock_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_rfc3339() {
        let dt = parse_datetime("2025-01-15T10:30:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-01-15T10:30:00+00:00");
    }

    #[test]
    fn test_parse_datetime_relative() {
        let before = Utc::now();
        let dt = parse_datetime("2 hours ago").unwrap();
        let expected = before - Duration::hours(2);
        assert!((dt - expected).num_seconds().abs() < 5);
    }

    #[test]
    fn test_parse_datetime_rejects_garbage() {
        let err = parse_datetime("yesterday-ish").unwrap_err();
        assert!(err.to_string().contains("Invalid datetime"));
    }

    #[test]
    fn test_parse_datetime_rejects_huge_relative() {
        assert!(parse_datetime("99999999 weeks ago").is_err());
    }

    #[test]
    fn test_parse_bound_date_covers_whole_day() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 29).unwrap();
        let start = parse_bound("2025-01-29", Bound::Start).unwrap();
        let end = parse_bound("2025-01-29", Bound::End).unwrap();

        assert_eq!(start, local_midnight_to_utc(date));
        assert_eq!(end.with_timezone(&Local).date_naive(), date);
        assert_eq!(
            end + Duration::milliseconds(1),
            local_midnight_to_utc(date + Duration::days(1))
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(9_000), "2h 30m");
        assert_eq!(format_duration(3_600), "1h 0m");
        assert_eq!(format_duration(2_754), "45m");
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(-10), "0s");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(2.0 / 3.0), "67%");
        assert_eq!(format_percent(0.0), "0%");
        assert_eq!(format_percent(1.0), "100%");
    }

    #[test]
    fn test_lock_store_creates_lock_next_to_database() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("nested").join("fw.db");

        let lock = lock_store(&db_path).unwrap();
        drop(lock);

        assert!(temp.path().join("nested").join("fw.lock").exists());
        // Released on drop, so it can be taken again.
        lock_store(&db_path).unwrap();
    }
}
