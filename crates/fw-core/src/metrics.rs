//! Derived metrics over sessions and focus intervals.
//!
//! Everything here is a pure function of its inputs. Metrics are recomputed
//! on every request and never persisted, so callers pass a snapshot and may
//! call in parallel.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::interval::FocusInterval;
use crate::session::Session;
use crate::types::{AppName, FocusState};

/// Time spent in one app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppUsage {
    pub app: AppName,
    /// Sum of closed session durations, in seconds.
    pub total_secs: i64,
    /// Number of sessions, open ones included.
    pub count: usize,
}

/// Focused versus unfocused time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FocusSummary {
    pub focused_secs: i64,
    pub unfocused_secs: i64,
    /// `focused / (focused + unfocused)`, or 0 when both are 0.
    pub focus_ratio: f64,
}

/// An unfocused interval, reported where it started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interruption {
    pub at: DateTime<Utc>,
    pub duration_secs: i64,
}

/// Aggregate statistics consumed by every display surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub total_duration_secs: i64,
    /// Sorted by `total_secs` descending; ties keep first-seen order.
    pub by_app: Vec<AppUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_app: Option<AppUsage>,
    pub focus_summary: FocusSummary,
    pub interruptions: Vec<Interruption>,
}

impl DerivedMetrics {
    /// Focused time as a share of tracked app time.
    ///
    /// Falls back to the focus ratio when no app time was tracked.
    #[allow(clippy::cast_precision_loss)]
    pub fn efficiency_ratio(&self) -> f64 {
        if self.total_duration_secs > 0 {
            self.focus_summary.focused_secs as f64 / self.total_duration_secs as f64
        } else {
            self.focus_summary.focus_ratio
        }
    }
}

/// Computes all derived metrics for a snapshot of sessions and intervals.
///
/// Open sessions count towards `by_app[..].count` but contribute no time.
/// `intervals` are expected in chronological order, as produced by
/// [`normalize_pings`](crate::normalize_pings).
pub fn compute_metrics(sessions: &[Session], intervals: &[FocusInterval]) -> DerivedMetrics {
    let by_app = usage_by_app(sessions);
    let total_duration_secs = by_app
        .iter()
        .fold(0_i64, |total, usage| total.saturating_add(usage.total_secs));
    let top_app = by_app.first().cloned();

    let focus_summary = summarize_focus(intervals);
    let interruptions = intervals
        .iter()
        .filter(|interval| interval.state == FocusState::Unfocused)
        .map(|interval| Interruption {
            at: interval.timestamp,
            duration_secs: interval.duration_secs,
        })
        .collect();

    DerivedMetrics {
        total_duration_secs,
        by_app,
        top_app,
        focus_summary,
        interruptions,
    }
}

/// Groups sessions by app, summing time and counting sessions.
pub fn usage_by_app(sessions: &[Session]) -> Vec<AppUsage> {
    let mut index: HashMap<&AppName, usize> = HashMap::new();
    let mut usage: Vec<AppUsage> = Vec::new();

    for session in sessions {
        let slot = *index.entry(&session.app_name).or_insert_with(|| {
            usage.push(AppUsage {
                app: session.app_name.clone(),
                total_secs: 0,
                count: 0,
            });
            usage.len() - 1
        });
        usage[slot].total_secs = usage[slot]
            .total_secs
            .saturating_add(session.duration_secs().unwrap_or(0));
        usage[slot].count += 1;
    }

    // Stable: equal totals stay in first-seen order.
    usage.sort_by(|a, b| b.total_secs.cmp(&a.total_secs));
    usage
}

/// Sums focused and unfocused time.
#[allow(clippy::cast_precision_loss)]
pub fn summarize_focus(intervals: &[FocusInterval]) -> FocusSummary {
    let mut focused_secs = 0_i64;
    let mut unfocused_secs = 0_i64;
    for interval in intervals {
        let total = match interval.state {
            FocusState::Focused => &mut focused_secs,
            FocusState::Unfocused => &mut unfocused_secs,
        };
        *total = total.saturating_add(interval.duration_secs);
    }

    let total = focused_secs.saturating_add(unfocused_secs);
    let focus_ratio = if total > 0 {
        focused_secs as f64 / total as f64
    } else {
        0.0
    };

    FocusSummary {
        focused_secs,
        unfocused_secs,
        focus_ratio,
    }
}

/// Up to `limit` distinct window titles per app, apps in first-seen order.
pub fn title_samples(sessions: &[Session], limit: usize) -> Vec<(AppName, Vec<String>)> {
    let mut samples: Vec<(AppName, Vec<String>)> = Vec::new();
    for session in sessions {
        let slot = match samples.iter().position(|(app, _)| *app == session.app_name) {
            Some(slot) => slot,
            None => {
                samples.push((session.app_name.clone(), Vec::new()));
                samples.len() - 1
            }
        };
        let titles = &mut samples[slot].1;
        if let Some(title) = &session.window_title {
            if titles.len() < limit && !titles.contains(title) {
                titles.push(title.clone());
            }
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StreamId;
    use chrono::{Duration, TimeZone};

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn session(app: &str, start: i64, end: Option<i64>) -> Session {
        let mut s = Session::open(
            StreamId::new("default").unwrap(),
            AppName::new(app).unwrap(),
            None,
            ts(start),
        );
        s.end_time = end.map(ts);
        s
    }

    fn interval(start: i64, state: FocusState, duration_secs: i64) -> FocusInterval {
        FocusInterval::new(ts(start), state, duration_secs)
    }

    #[test]
    fn empty_input_degrades_to_zero() {
        let metrics = compute_metrics(&[], &[]);

        assert_eq!(metrics.total_duration_secs, 0);
        assert!(metrics.by_app.is_empty());
        assert!(metrics.top_app.is_none());
        assert_eq!(metrics.focus_summary.focused_secs, 0);
        assert_eq!(metrics.focus_summary.unfocused_secs, 0);
        assert!(metrics.focus_summary.focus_ratio.abs() < f64::EPSILON);
        assert!(metrics.interruptions.is_empty());
        assert!(metrics.efficiency_ratio().abs() < f64::EPSILON);
    }

    #[test]
    fn huge_durations_saturate_instead_of_overflowing() {
        let intervals = [
            interval(0, FocusState::Focused, i64::MAX - 1),
            interval(10, FocusState::Focused, i64::MAX - 1),
            interval(20, FocusState::Unfocused, i64::MAX - 1),
        ];

        let summary = summarize_focus(&intervals);

        assert_eq!(summary.focused_secs, i64::MAX);
        assert_eq!(summary.unfocused_secs, i64::MAX - 1);
        assert!((0.0..=1.0).contains(&summary.focus_ratio));
    }

    #[test]
    fn focus_summary_and_interruptions() {
        let intervals = vec![
            interval(0, FocusState::Focused, 100),
            interval(100, FocusState::Unfocused, 50),
            interval(150, FocusState::Focused, 150),
        ];

        let metrics = compute_metrics(&[], &intervals);

        assert_eq!(metrics.focus_summary.focused_secs, 250);
        assert_eq!(metrics.focus_summary.unfocused_secs, 50);
        assert!((metrics.focus_summary.focus_ratio - 250.0 / 300.0).abs() < 1e-9);
        assert_eq!(
            metrics.interruptions,
            vec![Interruption {
                at: ts(100),
                duration_secs: 50
            }]
        );
    }

    #[test]
    fn by_app_sorted_desc_with_stable_ties() {
        let sessions = vec![
            session("B", 0, Some(60)),
            session("A", 60, Some(120)),
            session("C", 120, Some(300)),
            session("B", 300, Some(310)),
            session("A", 310, Some(320)),
        ];

        let by_app = usage_by_app(&sessions);

        let order: Vec<_> = by_app.iter().map(|u| u.app.as_str()).collect();
        assert_eq!(order, vec!["C", "B", "A"]);
        assert_eq!(by_app[1].total_secs, 70);
        assert_eq!(by_app[1].count, 2);
        assert_eq!(by_app[2].total_secs, 70);
    }

    #[test]
    fn open_sessions_count_but_add_no_time() {
        let sessions = vec![session("A", 0, Some(10)), session("B", 10, None)];

        let metrics = compute_metrics(&sessions, &[]);

        assert_eq!(metrics.total_duration_secs, 10);
        let b = metrics.by_app.iter().find(|u| u.app.as_str() == "B").unwrap();
        assert_eq!(b.count, 1);
        assert_eq!(b.total_secs, 0);
        assert_eq!(metrics.top_app.unwrap().app.as_str(), "A");
    }

    #[test]
    fn by_app_totals_sum_to_total() {
        let sessions: Vec<_> = (0..12)
            .map(|i| {
                let app = ["A", "B", "C"][i % 3];
                let start = i64::try_from(i).unwrap() * 100;
                session(app, start, Some(start + 7 * start % 90 + 1))
            })
            .collect();

        let metrics = compute_metrics(&sessions, &[]);

        let sum: i64 = metrics.by_app.iter().map(|u| u.total_secs).sum();
        assert_eq!(sum, metrics.total_duration_secs);
    }

    #[test]
    fn focus_ratio_stays_in_unit_range() {
        let cases = [
            vec![interval(0, FocusState::Focused, 10)],
            vec![interval(0, FocusState::Unfocused, 10)],
            vec![interval(0, FocusState::Focused, 0)],
            vec![
                interval(0, FocusState::Focused, 3),
                interval(3, FocusState::Unfocused, 7),
            ],
        ];
        for intervals in cases {
            let ratio = summarize_focus(&intervals).focus_ratio;
            assert!((0.0..=1.0).contains(&ratio), "ratio {ratio} out of range");
        }
    }

    #[test]
    fn efficiency_ratio_uses_app_time() {
        let sessions = vec![session("A", 0, Some(400))];
        let intervals = vec![interval(0, FocusState::Focused, 100)];

        let metrics = compute_metrics(&sessions, &intervals);

        assert!((metrics.efficiency_ratio() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn title_samples_are_distinct_and_limited() {
        let mut sessions = Vec::new();
        for (i, title) in ["a", "b", "a", "c", "d"].iter().enumerate() {
            let mut s = session("Code", i64::try_from(i).unwrap(), None);
            s.window_title = Some((*title).to_string());
            sessions.push(s);
        }
        sessions.push(session("Slack", 10, None));

        let samples = title_samples(&sessions, 3);

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].1, vec!["a", "b", "c"]);
        assert!(samples[1].1.is_empty());
    }
}
