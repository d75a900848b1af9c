//! Report command for summarizing app usage and focus.
//!
//! This module implements `fw report` with various period options
//! (--week, --last-week, --day, --last-day) and output formats (human-readable, JSON).

use std::fmt::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Utc};
use fw_core::{
    DerivedMetrics, FocusInterval, IntervalQuery, RecordStore, Session, SessionQuery, StreakStats,
    compute_metrics, compute_streaks,
};
use fw_db::Database;
use serde::Serialize;

use crate::Config;
use crate::commands::util::{format_duration, format_percent, local_midnight_to_utc};

/// Apps listed before the rest are folded into "... and N more".
const TOP_APPS: usize = 5;

/// Interruptions listed, longest first.
const TOP_INTERRUPTIONS: usize = 5;

/// Report period type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Week,
    LastWeek,
    Day,
    LastDay,
}

/// Period type for JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Week,
    Day,
}

/// Computed report data.
#[derive(Debug)]
pub struct ReportData {
    pub generated_at: DateTime<Utc>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub period_type: PeriodType,
    /// Human-readable period, e.g. "Week of Jan 27, 2025".
    pub period_label: String,
    pub timezone: String,
    pub session_count: usize,
    pub metrics: DerivedMetrics,
    pub streaks: StreakStats,
    pub interruption_min_secs: i64,
}

impl ReportData {
    fn is_empty(&self) -> bool {
        self.session_count == 0
            && self.metrics.focus_summary.focused_secs == 0
            && self.metrics.focus_summary.unfocused_secs == 0
    }
}

// ========== Period Date Calculation ==========

/// Calculates week boundaries (Mon 00:00 to next Mon 00:00 local time) as half-open interval.
fn week_boundaries(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let days_since_monday = today.weekday().num_days_from_monday();
    let monday = today - Duration::days(i64::from(days_since_monday));
    let next_monday = monday + Duration::days(7);
    (local_midnight_to_utc(monday), local_midnight_to_utc(next_monday))
}

/// Calculates last week boundaries (previous Mon 00:00 to this Mon 00:00 local time).
fn last_week_boundaries(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let days_since_monday = today.weekday().num_days_from_monday();
    let this_monday = today - Duration::days(i64::from(days_since_monday));
    let last_monday = this_monday - Duration::days(7);
    (local_midnight_to_utc(last_monday), local_midnight_to_utc(this_monday))
}

/// Calculates day boundaries (today 00:00 to tomorrow 00:00 local time).
fn day_boundaries(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let tomorrow = today + Duration::days(1);
    (local_midnight_to_utc(today), local_midnight_to_utc(tomorrow))
}

/// Calculates yesterday boundaries (yesterday 00:00 to today 00:00 local time).
fn last_day_boundaries(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let yesterday = today - Duration::days(1);
    (local_midnight_to_utc(yesterday), local_midnight_to_utc(today))
}

/// Get boundaries for a given period, using the provided date as reference.
pub fn get_period_boundaries(period: Period, today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    match period {
        Period::Week => week_boundaries(today),
        Period::LastWeek => last_week_boundaries(today),
        Period::Day => day_boundaries(today),
        Period::LastDay => last_day_boundaries(today),
    }
}

/// Formats the period description for the report header.
fn period_label(period_type: PeriodType, period_start: DateTime<Utc>) -> String {
    let start_date = period_start.with_timezone(&Local).date_naive();
    match period_type {
        PeriodType::Week => format!("Week of {}", start_date.format("%b %-d, %Y")),
        PeriodType::Day => format!("{}", start_date.format("%A, %b %-d, %Y")),
    }
}

// ========== Progress Bar ==========

/// Generates a 10-character progress bar.
/// Values <5% of max get a single block for visibility.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn progress_bar(value: i64, max: i64) -> String {
    if max <= 0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value as f64 / max as f64;
    let filled = if ratio < 0.05 && value > 0 {
        1
    } else {
        (ratio * 10.0).round().clamp(0.0, 10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

// ========== Report Generation ==========

/// Builds report data from a snapshot of sessions and intervals.
pub fn build_report(
    sessions: &[Session],
    intervals: &[FocusInterval],
    period: Period,
    (period_start, period_end): (DateTime<Utc>, DateTime<Utc>),
    generated_at: DateTime<Utc>,
    config: &Config,
) -> ReportData {
    let period_type = match period {
        Period::Week | Period::LastWeek => PeriodType::Week,
        Period::Day | Period::LastDay => PeriodType::Day,
    };
    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());

    ReportData {
        generated_at,
        period_start,
        period_end,
        period_type,
        period_label: period_label(period_type, period_start),
        timezone,
        session_count: sessions.len(),
        metrics: compute_metrics(sessions, intervals),
        streaks: compute_streaks(intervals),
        interruption_min_secs: config.interruption_min_secs,
    }
}

/// Loads the period from the database and builds report data.
pub fn generate_report_data(
    db: &Database,
    config: &Config,
    period: Period,
    generated_at: DateTime<Utc>,
) -> Result<ReportData> {
    let today = generated_at.with_timezone(&Local).date_naive();
    let (period_start, period_end) = get_period_boundaries(period, today);
    // Store queries are inclusive; the period is half-open.
    let last_instant = period_end - Duration::milliseconds(1);

    let sessions = db
        .list_sessions(&SessionQuery {
            stream: None,
            from: Some(period_start),
            to: Some(last_instant),
        })
        .context("failed to load sessions")?;
    let intervals = db
        .list_intervals(&IntervalQuery {
            from: Some(period_start),
            to: Some(last_instant),
        })
        .context("failed to load focus intervals")?;
    tracing::debug!(
        sessions = sessions.len(),
        intervals = intervals.len(),
        "loaded report period"
    );

    Ok(build_report(
        &sessions,
        &intervals,
        period,
        (period_start, period_end),
        generated_at,
        config,
    ))
}

/// Formats the human-readable report output.
pub fn format_report(data: &ReportData) -> String {
    let mut output = String::new();

    writeln!(output, "FOCUS REPORT: {}", data.period_label).unwrap();

    if data.is_empty() {
        let period_word = match data.period_type {
            PeriodType::Week => "week",
            PeriodType::Day => "day",
        };
        writeln!(output).unwrap();
        writeln!(output, "No activity recorded this {period_word}.").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "Hint: Run 'fw status' to check watcher health.").unwrap();
        return output;
    }

    let metrics = &data.metrics;
    let focus = &metrics.focus_summary;

    // SUMMARY section
    writeln!(output).unwrap();
    writeln!(output, "SUMMARY").unwrap();
    writeln!(output, "───────").unwrap();
    writeln!(
        output,
        "App time:     {} ({} sessions)",
        format_duration(metrics.total_duration_secs),
        data.session_count
    )
    .unwrap();
    writeln!(
        output,
        "Focused:      {} ({})",
        format_duration(focus.focused_secs),
        format_percent(focus.focus_ratio)
    )
    .unwrap();
    writeln!(output, "Unfocused:    {}", format_duration(focus.unfocused_secs)).unwrap();
    writeln!(output, "Efficiency:   {}", format_percent(metrics.efficiency_ratio())).unwrap();

    // TOP APPS section
    if !metrics.by_app.is_empty() {
        writeln!(output).unwrap();
        writeln!(output, "TOP APPS").unwrap();
        writeln!(output, "────────").unwrap();
        let max_total = metrics.by_app.first().map_or(0, |usage| usage.total_secs);
        for usage in metrics.by_app.iter().take(TOP_APPS) {
            writeln!(
                output,
                "{:<20} {:>7}  {}  ({})",
                usage.app.as_str(),
                format_duration(usage.total_secs),
                progress_bar(usage.total_secs, max_total),
                usage.count
            )
            .unwrap();
        }
        let remaining = metrics.by_app.len().saturating_sub(TOP_APPS);
        if remaining > 0 {
            writeln!(output, "... and {remaining} more").unwrap();
        }
    }

    // STREAKS section
    let streaks = &data.streaks;
    if streaks.longest_focused.is_some() || streaks.longest_unfocused.is_some() {
        writeln!(output).unwrap();
        writeln!(output, "STREAKS").unwrap();
        writeln!(output, "───────").unwrap();
        let longest = |streak: Option<&fw_core::Streak>| {
            streak.map_or_else(|| "-".to_string(), |s| format_duration(s.duration_secs))
        };
        writeln!(
            output,
            "Longest focused:    {}",
            longest(streaks.longest_focused.as_ref())
        )
        .unwrap();
        writeln!(
            output,
            "Longest unfocused:  {}",
            longest(streaks.longest_unfocused.as_ref())
        )
        .unwrap();
        #[allow(clippy::cast_possible_truncation)]
        let average = streaks.average_focused_secs.round() as i64;
        writeln!(output, "Average focused:    {}", format_duration(average)).unwrap();
    }

    // INTERRUPTIONS section
    let mut shown: Vec<_> = metrics
        .interruptions
        .iter()
        .filter(|i| i.duration_secs >= data.interruption_min_secs)
        .collect();
    if !shown.is_empty() {
        writeln!(output).unwrap();
        writeln!(output, "INTERRUPTIONS ({})", shown.len()).unwrap();
        writeln!(output, "─────────────").unwrap();
        shown.sort_by_key(|i| std::cmp::Reverse(i.duration_secs));
        for interruption in shown.iter().take(TOP_INTERRUPTIONS) {
            writeln!(
                output,
                "{}  {}",
                interruption.at.format("%Y-%m-%d %H:%M UTC"),
                format_duration(interruption.duration_secs)
            )
            .unwrap();
        }
        let remaining = shown.len().saturating_sub(TOP_INTERRUPTIONS);
        if remaining > 0 {
            writeln!(output, "... and {remaining} more").unwrap();
        }
    }

    output
}

// ========== JSON Output ==========

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub generated_at: String,
    pub timezone: String,
    pub period: JsonPeriod,
    pub session_count: usize,
    pub efficiency_ratio: f64,
    pub metrics: &'a DerivedMetrics,
    pub streaks: &'a StreakStats,
}

#[derive(Debug, Serialize)]
pub struct JsonPeriod {
    pub start: String,
    pub end: String,
    #[serde(rename = "type")]
    pub period_type: PeriodType,
}

/// Formats report data as JSON.
pub fn format_report_json(data: &ReportData) -> Result<String> {
    let local_start = data.period_start.with_timezone(&Local);
    let local_end = data.period_end.with_timezone(&Local);

    // period_end is the first moment of the next period; report the last day.
    let end_date = (local_end.date_naive() - Duration::days(1))
        .format("%Y-%m-%d")
        .to_string();

    let report = JsonReport {
        generated_at: data.generated_at.to_rfc3339(),
        timezone: data.timezone.clone(),
        period: JsonPeriod {
            start: local_start.date_naive().format("%Y-%m-%d").to_string(),
            end: end_date,
            period_type: data.period_type,
        },
        session_count: data.session_count,
        efficiency_ratio: data.metrics.efficiency_ratio(),
        metrics: &data.metrics,
        streaks: &data.streaks,
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

// ========== Public Interface ==========

/// Runs the report command.
pub fn run(db: &Database, config: &Config, period: Period, json: bool) -> Result<()> {
    let data = generate_report_data(db, config, period, Utc::now())?;

    if json {
        let output = format_report_json(&data)?;
        println!("{output}");
    } else {
        let output = format_report(&data);
        print!("{output}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fw_core::{AppName, FocusState, StreamId};
    use insta::assert_snapshot;

    // ========== Period Date Calculation Tests ==========

    #[test]
    fn test_week_boundaries_for_known_date() {
        // Jan 29, 2025 is a Wednesday
        let wednesday = NaiveDate::from_ymd_opt(2025, 1, 29).unwrap();
        let (start, end) = week_boundaries(wednesday);

        let start_local = start.with_timezone(&Local).date_naive();
        let end_local = end.with_timezone(&Local).date_naive();

        assert_eq!(start_local, NaiveDate::from_ymd_opt(2025, 1, 27).unwrap());
        assert_eq!(end_local, NaiveDate::from_ymd_opt(2025, 2, 3).unwrap());
    }

    #[test]
    fn test_week_boundaries_on_sunday() {
        // Feb 2, 2025 is a Sunday
        let sunday = NaiveDate::from_ymd_opt(2025, 2, 2).unwrap();
        let (start, end) = week_boundaries(sunday);

        let start_local = start.with_timezone(&Local).date_naive();
        let end_local = end.with_timezone(&Local).date_naive();

        assert_eq!(start_local, NaiveDate::from_ymd_opt(2025, 1, 27).unwrap());
        assert_eq!(end_local, NaiveDate::from_ymd_opt(2025, 2, 3).unwrap());
    }

    #[test]
    fn test_last_week_boundaries_for_known_date() {
        let wednesday = NaiveDate::from_ymd_opt(2025, 1, 29).unwrap();
        let (start, end) = last_week_boundaries(wednesday);

        let start_local = start.with_timezone(&Local).date_naive();
        let end_local = end.with_timezone(&Local).date_naive();

        assert_eq!(start_local, NaiveDate::from_ymd_opt(2025, 1, 20).unwrap());
        assert_eq!(end_local, NaiveDate::from_ymd_opt(2025, 1, 27).unwrap());
    }

    #[test]
    fn test_day_and_last_day_boundaries() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 29).unwrap();

        let (start, end) = day_boundaries(date);
        assert_eq!(start.with_timezone(&Local).date_naive(), date);
        assert_eq!(
            end.with_timezone(&Local).date_naive(),
            NaiveDate::from_ymd_opt(2025, 1, 30).unwrap()
        );

        let (start, end) = last_day_boundaries(date);
        assert_eq!(
            start.with_timezone(&Local).date_naive(),
            NaiveDate::from_ymd_opt(2025, 1, 28).unwrap()
        );
        assert_eq!(end.with_timezone(&Local).date_naive(), date);
    }

    // ========== Progress Bar Tests ==========

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(100, 100), "██████████");
        assert_eq!(progress_bar(50, 100), "█████░░░░░");
        assert_eq!(progress_bar(4, 100), "█░░░░░░░░░");
        assert_eq!(progress_bar(0, 100), "░░░░░░░░░░");
        assert_eq!(progress_bar(0, 0), "░░░░░░░░░░");
    }

    // ========== Report Rendering ==========

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 29, 9, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn session(app: &str, start: i64, end: i64) -> Session {
        let mut s = Session::open(
            StreamId::new("default").unwrap(),
            AppName::new(app).unwrap(),
            None,
            ts(start),
        );
        s.end_time = Some(ts(end));
        s
    }

    fn test_data(sessions: &[Session], intervals: &[FocusInterval]) -> ReportData {
        ReportData {
            generated_at: Utc.with_ymd_and_hms(2025, 1, 29, 16, 0, 0).unwrap(),
            period_start: Utc.with_ymd_and_hms(2025, 1, 29, 8, 0, 0).unwrap(),
            period_end: Utc.with_ymd_and_hms(2025, 1, 30, 8, 0, 0).unwrap(),
            period_type: PeriodType::Day,
            period_label: "Wednesday, Jan 29, 2025".to_string(),
            timezone: "America/Los_Angeles".to_string(),
            session_count: sessions.len(),
            metrics: compute_metrics(sessions, intervals),
            streaks: compute_streaks(intervals),
            interruption_min_secs: 60,
        }
    }

    #[test]
    fn test_report_empty_period() {
        let output = format_report(&test_data(&[], &[]));
        assert_snapshot!(output, @r"
        FOCUS REPORT: Wednesday, Jan 29, 2025

        No activity recorded this day.

        Hint: Run 'fw status' to check watcher health.
        ");
    }

    #[test]
    fn test_report_full() {
        let sessions = vec![
            session("Code", 0, 3_600),
            session("Slack", 3_600, 4_500),
            session("Code", 4_500, 7_200),
        ];
        let intervals = vec![
            FocusInterval::new(ts(0), FocusState::Focused, 3_000),
            FocusInterval::new(ts(3_000), FocusState::Unfocused, 600),
            FocusInterval::new(ts(3_600), FocusState::Focused, 1_800),
            FocusInterval::new(ts(5_400), FocusState::Unfocused, 30),
            FocusInterval::new(ts(5_430), FocusState::Focused, 1_770),
        ];

        let output = format_report(&test_data(&sessions, &intervals));
        assert_snapshot!(output, @r"
        FOCUS REPORT: Wednesday, Jan 29, 2025

        SUMMARY
        ───────
        App time:     2h 0m (3 sessions)
        Focused:      1h 49m (91%)
        Unfocused:    10m
        Efficiency:   91%

        TOP APPS
        ────────
        Code                  1h 45m  ██████████  (2)
        Slack                    15m  █░░░░░░░░░  (1)

        STREAKS
        ───────
        Longest focused:    50m
        Longest unfocused:  10m
        Average focused:    36m

        INTERRUPTIONS (1)
        ─────────────
        2025-01-29 09:50 UTC  10m
        ");
    }

    #[test]
    fn test_report_json_output() {
        let sessions = vec![session("Code", 0, 600)];
        let intervals = vec![FocusInterval::new(ts(0), FocusState::Focused, 300)];

        let output = format_report_json(&test_data(&sessions, &intervals)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["period"]["type"], "day");
        assert_eq!(value["session_count"], 1);
        assert_eq!(value["metrics"]["total_duration_secs"], 600);
        assert_eq!(value["metrics"]["top_app"]["app"], "Code");
        assert_eq!(value["metrics"]["focus_summary"]["focused_secs"], 300);
        assert_eq!(value["efficiency_ratio"], 0.5);
        assert_eq!(value["streaks"]["longest_focused"]["duration_secs"], 300);
    }

    #[test]
    fn test_generate_report_data_reads_period_from_store() {
        let mut db = Database::open_in_memory().unwrap();
        let now = local_midnight_to_utc(Local::now().date_naive()) + Duration::hours(12);
        let inside = Session::open(
            StreamId::new("default").unwrap(),
            AppName::new("Code").unwrap(),
            None,
            now - Duration::minutes(5),
        );
        let outside = Session::open(
            StreamId::new("default").unwrap(),
            AppName::new("Mail").unwrap(),
            None,
            now - Duration::days(30),
        );
        db.append_or_update_session(&outside).unwrap();
        db.close_session(&outside.id, now - Duration::days(29)).unwrap();
        db.append_or_update_session(&inside).unwrap();

        let data = generate_report_data(&db, &Config::default(), Period::Day, now).unwrap();

        assert_eq!(data.session_count, 1);
        assert_eq!(data.metrics.by_app[0].app.as_str(), "Code");
    }
}
