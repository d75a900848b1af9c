//! Foreground app observations and the sessions they reduce to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AppName, SessionId, StreamId};

/// A point-in-time report that `app` held foreground focus.
///
/// Observations arrive from the app watcher and are never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// The foreground application.
    pub app: AppName,
    /// The focused window title, if the watcher could read one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_title: Option<String>,
    /// When the watcher saw this app in front.
    pub observed_at: DateTime<Utc>,
}

impl Observation {
    /// Creates an observation. A blank window title is treated as absent.
    pub fn new(app: AppName, window_title: Option<String>, observed_at: DateTime<Utc>) -> Self {
        let window_title = window_title.filter(|title| !title.trim().is_empty());
        Self {
            app,
            window_title,
            observed_at,
        }
    }
}

/// A contiguous time range during which one application held foreground focus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Deterministic identifier, see [`SessionId::derive`].
    pub id: SessionId,
    /// The watcher stream that produced this session.
    pub stream: StreamId,
    /// The foreground application.
    pub app_name: AppName,
    /// Latest known window title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_title: Option<String>,
    /// When the app came to the foreground.
    pub start_time: DateTime<Utc>,
    /// When another app took over. `None` while the session is open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl Session {
    /// Opens a new session for `app` on `stream`.
    pub fn open(
        stream: StreamId,
        app_name: AppName,
        window_title: Option<String>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self::open_after(None, stream, app_name, window_title, start_time)
    }

    /// Opens the session that replaces `previous` on `stream`.
    pub fn open_after(
        previous: Option<&SessionId>,
        stream: StreamId,
        app_name: AppName,
        window_title: Option<String>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SessionId::derive(&stream, &app_name, start_time, previous),
            stream,
            app_name,
            window_title,
            start_time,
            end_time: None,
        }
    }

    /// Returns true while no end time has been recorded.
    pub const fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Whole seconds between start and end, or `None` while open.
    pub fn duration_secs(&self) -> Option<i64> {
        self.end_time.map(|end| (end - self.start_time).num_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    #[test]
    fn observation_drops_blank_title() {
        let obs = Observation::new(AppName::new("Code").unwrap(), Some("  ".into()), ts(0));
        assert_eq!(obs.window_title, None);
    }

    #[test]
    fn open_session_has_no_duration() {
        let session = Session::open(
            StreamId::new("default").unwrap(),
            AppName::new("Code").unwrap(),
            None,
            ts(0),
        );
        assert!(session.is_open());
        assert_eq!(session.duration_secs(), None);
    }

    #[test]
    fn closed_session_duration_floors_to_seconds() {
        let mut session = Session::open(
            StreamId::new("default").unwrap(),
            AppName::new("Code").unwrap(),
            None,
            ts(0),
        );
        session.end_time = Some(ts(90) + Duration::milliseconds(999));
        assert_eq!(session.duration_secs(), Some(90));
    }

    #[test]
    fn session_serialization_omits_open_end() {
        let session = Session::open(
            StreamId::new("default").unwrap(),
            AppName::new("Code").unwrap(),
            None,
            ts(0),
        );
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("end_time").is_none());
        assert_eq!(json["app_name"], "Code");
    }
}
