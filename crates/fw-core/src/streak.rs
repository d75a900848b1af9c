//! Focus streaks.
//!
//! A streak is a maximal run of consecutive intervals in the same state. The
//! stats are computed on demand, after the caller has applied its own
//! filters, so they are not part of [`DerivedMetrics`](crate::DerivedMetrics).

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::interval::FocusInterval;
use crate::types::FocusState;

/// A run of same-state intervals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Streak {
    pub state: FocusState,
    pub start: DateTime<Utc>,
    pub duration_secs: i64,
    /// Number of intervals in the run.
    pub intervals: usize,
}

/// Longest and average streaks over an interval sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StreakStats {
    pub longest_focused: Option<Streak>,
    pub longest_unfocused: Option<Streak>,
    /// Mean length of focused streaks with non-zero time, 0 when there are none.
    pub average_focused_secs: f64,
}

#[derive(Default)]
struct Accumulator {
    current: Option<Streak>,
    longest_focused: Option<Streak>,
    longest_unfocused: Option<Streak>,
    focused_total: i64,
    focused_count: u32,
}

impl Accumulator {
    fn push(&mut self, interval: &FocusInterval) {
        match &mut self.current {
            Some(streak) if streak.state == interval.state => {
                streak.duration_secs = streak.duration_secs.saturating_add(interval.duration_secs);
                streak.intervals += 1;
            }
            _ => {
                self.close();
                self.current = Some(Streak {
                    state: interval.state,
                    start: interval.timestamp,
                    duration_secs: interval.duration_secs,
                    intervals: 1,
                });
            }
        }
    }

    fn close(&mut self) {
        let Some(streak) = self.current.take() else {
            return;
        };
        let longest = match streak.state {
            FocusState::Focused => {
                if streak.duration_secs > 0 {
                    self.focused_total = self.focused_total.saturating_add(streak.duration_secs);
                    self.focused_count += 1;
                }
                &mut self.longest_focused
            }
            FocusState::Unfocused => &mut self.longest_unfocused,
        };
        // Strictly longer only: the earliest of equal streaks wins, and
        // zero-length runs are never reported.
        let current_best = longest.as_ref().map_or(0, |s| s.duration_secs);
        if streak.duration_secs > current_best {
            *longest = Some(streak);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(mut self) -> StreakStats {
        self.close();
        let average_focused_secs = if self.focused_count > 0 {
            self.focused_total as f64 / f64::from(self.focused_count)
        } else {
            0.0
        };
        StreakStats {
            longest_focused: self.longest_focused,
            longest_unfocused: self.longest_unfocused,
            average_focused_secs,
        }
    }
}

/// Computes streak stats in one pass over chronologically ordered intervals.
pub fn compute_streaks(intervals: &[FocusInterval]) -> StreakStats {
    let mut acc = Accumulator::default();
    for interval in intervals {
        acc.push(interval);
    }
    acc.finish()
}
