//! Focus pings and the interval normalizer.
//!
//! The eye watcher reports its state every few seconds, often without a
//! duration. Normalization turns a fully collected batch of pings into an
//! ordered sequence of intervals where every duration is known:
//!
//! 1. Sort ascending by timestamp (stable, so equal timestamps keep input order)
//! 2. Walk forward once with a lookahead of one ping
//! 3. A missing or non-positive duration becomes the gap to the next ping,
//!    or [`DEFAULT_LAST_PING_SECS`] for the final ping
//!
//! This is a batch transform. It is not an online algorithm: appending a ping
//! can change the duration of the one before it, so callers re-run it over
//! the whole batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{FocusState, IntervalId};

/// Duration given to the last ping when it carries none, in seconds.
pub const DEFAULT_LAST_PING_SECS: i64 = 60;

/// A raw, validated focus report from the eye watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusPing {
    pub timestamp: DateTime<Utc>,
    pub state: FocusState,
    /// Reported duration in seconds. `None` or `<= 0` means "fill in".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<i64>,
}

/// A focus ping with a resolved, non-negative duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusInterval {
    pub id: IntervalId,
    pub timestamp: DateTime<Utc>,
    pub state: FocusState,
    pub duration_secs: i64,
}

impl FocusInterval {
    pub fn new(timestamp: DateTime<Utc>, state: FocusState, duration_secs: i64) -> Self {
        Self {
            id: IntervalId::derive(timestamp, state),
            timestamp,
            state,
            duration_secs: duration_secs.max(0),
        }
    }

    pub const fn is_focused(&self) -> bool {
        matches!(self.state, FocusState::Focused)
    }
}

/// Normalizes a batch of pings into chronologically ordered intervals.
///
/// Produces exactly one interval per input ping.
pub fn normalize_pings(mut pings: Vec<FocusPing>) -> Vec<FocusInterval> {
    pings.sort_by_key(|ping| ping.timestamp);

    let mut intervals = Vec::with_capacity(pings.len());
    let mut iter = pings.iter().peekable();
    while let Some(ping) = iter.next() {
        let duration_secs = match ping.duration_secs {
            Some(secs) if secs > 0 => secs,
            _ => iter.peek().map_or(DEFAULT_LAST_PING_SECS, |next| {
                (next.timestamp - ping.timestamp).num_seconds().max(0)
            }),
        };
        intervals.push(FocusInterval::new(ping.timestamp, ping.state, duration_secs));
    }

    tracing::debug!(intervals = intervals.len(), "normalized focus pings");
    intervals
}
