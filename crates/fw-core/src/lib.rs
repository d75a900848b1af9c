//! Core domain logic for focuswatch.
//!
//! This crate contains the fundamental types and logic for:
//! - Sessions: folding app-watcher observations into contiguous app sessions
//! - Focus intervals: normalizing raw focus pings into durations
//! - Metrics: per-app usage, focus ratio, interruptions and streaks
//! - Filtering and per-app timelines for display surfaces

mod filter;
mod interval;
mod metrics;
mod reducer;
pub mod session;
mod store;
mod streak;
mod timeline;
mod types;
pub mod watch;

pub use filter::{DateRange, IntervalFilter, SessionFilter};
pub use interval::{DEFAULT_LAST_PING_SECS, FocusInterval, FocusPing, normalize_pings};
pub use metrics::{
    AppUsage, DerivedMetrics, FocusSummary, Interruption, compute_metrics, summarize_focus,
    title_samples, usage_by_app,
};
pub use reducer::{
    ClosedSession, InvariantViolation, RecordError, SessionAction, SessionReducer,
    record_observation,
};
pub use session::{Observation, Session};
pub use store::{IntervalQuery, MemoryStore, MemoryStoreError, RecordStore, SessionQuery};
pub use streak::{Streak, StreakStats, compute_streaks};
pub use timeline::{Lane, LaneItem, Timeline, app_lanes};
pub use types::{
    AppName, FocusState, IntervalId, SessionId, StreamId, ValidationError, format_timestamp,
    parse_timestamp,
};
pub use watch::{AppPayload, FocusPayload, MAX_PING_SECS, ValidatedEvent, WatcherEvent};
