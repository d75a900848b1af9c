//! Caller-supplied filters applied before metrics and streaks are computed.

use chrono::{DateTime, Utc};

use crate::interval::FocusInterval;
use crate::session::Session;
use crate::types::{AppName, FocusState};

/// A time range, inclusive on both ends. Missing bounds are open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub const fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
    }
}

/// Which focus intervals to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalFilter {
    pub range: DateRange,
    pub min_duration_secs: i64,
    pub include_focused: bool,
    pub include_unfocused: bool,
}

impl Default for IntervalFilter {
    fn default() -> Self {
        Self {
            range: DateRange::default(),
            min_duration_secs: 0,
            include_focused: true,
            include_unfocused: true,
        }
    }
}

impl IntervalFilter {
    pub fn matches(&self, interval: &FocusInterval) -> bool {
        let state_ok = match interval.state {
            FocusState::Focused => self.include_focused,
            FocusState::Unfocused => self.include_unfocused,
        };
        state_ok
            && interval.duration_secs >= self.min_duration_secs
            && self.range.contains(interval.timestamp)
    }

    /// Keeps matching intervals, preserving order.
    pub fn apply(&self, intervals: &[FocusInterval]) -> Vec<FocusInterval> {
        intervals
            .iter()
            .filter(|interval| self.matches(interval))
            .cloned()
            .collect()
    }
}

/// Which sessions to keep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    /// Case-insensitive substring of the app name or window title.
    pub query: Option<String>,
    /// Applied to `start_time`.
    pub range: DateRange,
    /// Only these apps, or all apps when empty.
    pub apps: Vec<AppName>,
}

impl SessionFilter {
    pub fn matches(&self, session: &Session) -> bool {
        self.matches_query(session)
            && self.range.contains(session.start_time)
            && (self.apps.is_empty() || self.apps.contains(&session.app_name))
    }

    fn matches_query(&self, session: &Session) -> bool {
        let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
            return true;
        };
        let needle = query.to_lowercase();
        session.app_name.as_str().to_lowercase().contains(&needle)
            || session
                .window_title
                .as_deref()
                .is_some_and(|title| title.to_lowercase().contains(&needle))
    }

    /// Keeps matching sessions, preserving order.
    pub fn apply(&self, sessions: &[Session]) -> Vec<Session> {
        sessions
            .iter()
            .filter(|session| self.matches(session))
            .cloned()
            .collect()
    }
}
