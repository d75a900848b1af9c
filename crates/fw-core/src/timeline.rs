//! Per-app session timelines.
//!
//! Sessions are laid out in one lane per app so a display can draw them on
//! a shared time axis.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::session::Session;
use crate::types::{AppName, SessionId};

/// One closed session placed on a lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneItem {
    pub id: SessionId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_secs: i64,
}

/// All sessions of one app, sorted by start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lane {
    pub app: AppName,
    pub items: Vec<LaneItem>,
}

/// Lanes plus the overall span they cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub lanes: Vec<Lane>,
    /// Earliest start and latest end across all lanes, `None` when empty.
    pub span: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl Timeline {
    /// Position of `item` within the span as `(offset, width)` fractions of
    /// the span, each in `[0, 1]`.
    #[allow(clippy::cast_precision_loss)]
    pub fn placement(&self, item: &LaneItem) -> (f64, f64) {
        let Some((start, end)) = self.span else {
            return (0.0, 0.0);
        };
        let total = (end - start).num_milliseconds().max(1) as f64;
        let offset = (item.start - start).num_milliseconds() as f64 / total;
        let width = (item.end - item.start).num_milliseconds() as f64 / total;
        (offset.clamp(0.0, 1.0), width.clamp(0.0, 1.0))
    }
}

/// Builds one lane per entry in `apps`, in that order.
///
/// Only closed sessions lasting at least `min_duration_secs` are placed; an
/// app with none still gets an empty lane.
pub fn app_lanes(sessions: &[Session], apps: &[AppName], min_duration_secs: i64) -> Timeline {
    let mut lanes: Vec<Lane> = apps
        .iter()
        .map(|app| Lane {
            app: app.clone(),
            items: Vec::new(),
        })
        .collect();

    for session in sessions {
        let (Some(end), Some(duration_secs)) = (session.end_time, session.duration_secs()) else {
            continue;
        };
        if duration_secs < min_duration_secs {
            continue;
        }
        if let Some(lane) = lanes.iter_mut().find(|lane| lane.app == session.app_name) {
            lane.items.push(LaneItem {
                id: session.id.clone(),
                start: session.start_time,
                end,
                duration_secs,
            });
        }
    }

    for lane in &mut lanes {
        lane.items.sort_by_key(|item| item.start);
    }

    let span = lanes
        .iter()
        .flat_map(|lane| lane.items.iter())
        .fold(None, |span, item| match span {
            None => Some((item.start, item.end)),
            Some((start, end)) => Some((item.start.min(start), item.end.max(end))),
        });

    Timeline { lanes, span }
}
