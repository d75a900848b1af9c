//! Sessions command for browsing app sessions.
//!
//! Lists matching sessions, groups them by app with a few window titles,
//! and draws one timeline lane per app when apps are selected.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use fw_core::{
    AppName, DateRange, Lane, RecordStore, Session, SessionFilter, SessionQuery, Timeline,
    app_lanes, title_samples, usage_by_app,
};
use fw_db::Database;
use serde::Serialize;

use crate::cli::SessionsArgs;
use crate::commands::util::{Bound, format_duration, parse_optional_bound};

/// Window titles shown per app.
const TITLE_SAMPLES: usize = 3;

/// Timeline width in characters.
const LANE_WIDTH: usize = 48;

/// Usage of one app among the listed sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppSummary {
    pub app: AppName,
    pub total_secs: i64,
    pub count: usize,
    pub titles: Vec<String>,
}

/// Everything `fw sessions` shows.
#[derive(Debug, Serialize)]
pub struct SessionsView {
    pub sessions: Vec<Session>,
    pub by_app: Vec<AppSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
}

/// Applies `filter` and the minimum duration, then summarizes.
///
/// With a positive `min_duration_secs`, open sessions are left out since
/// their length is not known yet.
pub fn build_view(
    sessions: &[Session],
    filter: &SessionFilter,
    min_duration_secs: i64,
) -> SessionsView {
    let sessions: Vec<Session> = filter
        .apply(sessions)
        .into_iter()
        .filter(|session| {
            min_duration_secs <= 0
                || session
                    .duration_secs()
                    .is_some_and(|secs| secs >= min_duration_secs)
        })
        .collect();

    let mut samples = title_samples(&sessions, TITLE_SAMPLES);
    let by_app = usage_by_app(&sessions)
        .into_iter()
        .map(|usage| {
            let titles = samples
                .iter_mut()
                .find(|(app, _)| *app == usage.app)
                .map(|(_, titles)| std::mem::take(titles))
                .unwrap_or_default();
            AppSummary {
                app: usage.app,
                total_secs: usage.total_secs,
                count: usage.count,
                titles,
            }
        })
        .collect();

    let timeline = if filter.apps.is_empty() {
        None
    } else {
        Some(app_lanes(&sessions, &filter.apps, min_duration_secs))
    };

    SessionsView {
        sessions,
        by_app,
        timeline,
    }
}

/// Draws a lane as a fixed-width strip, `█` where the app was in front.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn render_lane(timeline: &Timeline, lane: &Lane, width: usize) -> String {
    let mut cells = vec!['·'; width];
    for item in &lane.items {
        let (offset, span) = timeline.placement(item);
        let start = ((offset * width as f64).floor() as usize).min(width.saturating_sub(1));
        let len = ((span * width as f64).round() as usize).max(1);
        for cell in cells.iter_mut().skip(start).take(len) {
            *cell = '█';
        }
    }
    cells.into_iter().collect()
}

/// Formats the human-readable listing.
pub fn format_view(view: &SessionsView) -> String {
    let mut output = String::new();

    if view.sessions.is_empty() {
        writeln!(output, "No matching sessions.").unwrap();
        return output;
    }

    writeln!(output, "SESSIONS ({})", view.sessions.len()).unwrap();
    for session in &view.sessions {
        let duration = session
            .duration_secs()
            .map_or_else(|| "open".to_string(), format_duration);
        let line = format!(
            "{}  {:>7}  {:<16} {}",
            session.start_time.format("%Y-%m-%d %H:%M:%S"),
            duration,
            session.app_name.as_str(),
            session.window_title.as_deref().unwrap_or_default()
        );
        writeln!(output, "{}", line.trim_end()).unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "BY APP").unwrap();
    for summary in &view.by_app {
        let line = format!(
            "{:<16} {:>7}  ({})  {}",
            summary.app.as_str(),
            format_duration(summary.total_secs),
            summary.count,
            summary.titles.join(" | ")
        );
        writeln!(output, "{}", line.trim_end()).unwrap();
    }

    if let Some(timeline) = &view.timeline {
        writeln!(output).unwrap();
        match timeline.span {
            Some((start, end)) => writeln!(
                output,
                "TIMELINE {} - {} UTC",
                start.format("%Y-%m-%d %H:%M"),
                end.format("%H:%M")
            )
            .unwrap(),
            None => writeln!(output, "TIMELINE (no closed sessions)").unwrap(),
        }
        for lane in &timeline.lanes {
            writeln!(
                output,
                "{:<16} {}",
                lane.app.as_str(),
                render_lane(timeline, lane, LANE_WIDTH)
            )
            .unwrap();
        }
    }

    output
}

pub fn run<W: Write>(writer: &mut W, db: &Database, args: &SessionsArgs) -> Result<()> {
    let range = DateRange::new(
        parse_optional_bound(args.from.as_deref(), Bound::Start, "from")?,
        parse_optional_bound(args.to.as_deref(), Bound::End, "to")?,
    );
    let apps = args
        .apps
        .iter()
        .map(|app| AppName::new(app.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .context("invalid --app")?;

    let sessions = db
        .list_sessions(&SessionQuery {
            stream: None,
            from: range.from,
            to: range.to,
        })
        .context("failed to load sessions")?;

    let filter = SessionFilter {
        query: args.query.clone(),
        range,
        apps,
    };
    let view = build_view(&sessions, &filter, args.min_minutes.saturating_mul(60));

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&view)?)?;
    } else {
        write!(writer, "{}", format_view(&view))?;
    }
    Ok(())
}
