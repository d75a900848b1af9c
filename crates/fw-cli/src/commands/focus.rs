//! Focus command for browsing focus intervals and streaks.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use fw_core::{
    DateRange, FocusInterval, FocusSummary, IntervalFilter, IntervalQuery, RecordStore,
    StreakStats, compute_streaks, summarize_focus,
};
use fw_db::Database;
use serde::Serialize;

use crate::cli::FocusArgs;
use crate::commands::util::{Bound, format_duration, format_percent, parse_optional_bound};

/// Everything `fw focus` shows.
#[derive(Debug, Serialize)]
pub struct FocusView {
    pub intervals: Vec<FocusInterval>,
    pub summary: FocusSummary,
    pub streaks: StreakStats,
}

/// Filters intervals, then summarizes what is left.
///
/// Streaks are computed over the filtered sequence, so hiding a state
/// merges the runs on either side of it.
pub fn build_view(intervals: &[FocusInterval], filter: &IntervalFilter) -> FocusView {
    let intervals = filter.apply(intervals);
    FocusView {
        summary: summarize_focus(&intervals),
        streaks: compute_streaks(&intervals),
        intervals,
    }
}

pub fn format_view(view: &FocusView) -> String {
    let mut output = String::new();

    if view.intervals.is_empty() {
        writeln!(output, "No matching focus intervals.").unwrap();
        return output;
    }

    writeln!(output, "INTERVALS ({})", view.intervals.len()).unwrap();
    for interval in &view.intervals {
        writeln!(
            output,
            "{}  {:<9}  {:>7}",
            interval.timestamp.format("%Y-%m-%d %H:%M:%S"),
            interval.state.as_str(),
            format_duration(interval.duration_secs)
        )
        .unwrap();
    }

    let summary = &view.summary;
    writeln!(output).unwrap();
    writeln!(
        output,
        "Focused:    {} ({})",
        format_duration(summary.focused_secs),
        format_percent(summary.focus_ratio)
    )
    .unwrap();
    writeln!(output, "Unfocused:  {}", format_duration(summary.unfocused_secs)).unwrap();

    if let Some(streak) = &view.streaks.longest_focused {
        writeln!(
            output,
            "Longest focused streak:    {} from {}",
            format_duration(streak.duration_secs),
            streak.start.format("%Y-%m-%d %H:%M:%S")
        )
        .unwrap();
    }
    if let Some(streak) = &view.streaks.longest_unfocused {
        writeln!(
            output,
            "Longest unfocused streak:  {} from {}",
            format_duration(streak.duration_secs),
            streak.start.format("%Y-%m-%d %H:%M:%S")
        )
        .unwrap();
    }
    #[allow(clippy::cast_possible_truncation)]
    let average = view.streaks.average_focused_secs.round() as i64;
    writeln!(output, "Average focused streak:    {}", format_duration(average)).unwrap();

    output
}

pub fn run<W: Write>(writer: &mut W, db: &Database, args: &FocusArgs) -> Result<()> {
    let range = DateRange::new(
        parse_optional_bound(args.from.as_deref(), Bound::Start, "from")?,
        parse_optional_bound(args.to.as_deref(), Bound::End, "to")?,
    );
    let intervals = db
        .list_intervals(&IntervalQuery {
            from: range.from,
            to: range.to,
        })
        .context("failed to load focus intervals")?;

    let filter = IntervalFilter {
        range,
        min_duration_secs: args.min_minutes.saturating_mul(60),
        include_focused: !args.no_focused,
        include_unfocused: !args.no_unfocused,
    };
    let view = build_view(&intervals, &filter);

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&view)?)?;
    } else {
        write!(writer, "{}", format_view(&view))?;
    }
    Ok(())
}
