//! The record store seam.
//!
//! The core never persists anything itself. It hands sessions and intervals
//! to a [`RecordStore`] and treats them as durable once the call returns.
//! `fw-db` provides the `SQLite` implementation; [`MemoryStore`] backs tests
//! and embedders that do not need durability.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::interval::FocusInterval;
use crate::session::Session;
use crate::types::{SessionId, StreamId};

/// Which sessions to list. Bounds apply to `start_time`, inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionQuery {
    pub stream: Option<StreamId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl SessionQuery {
    pub fn matches(&self, session: &Session) -> bool {
        self.stream.as_ref().is_none_or(|s| *s == session.stream)
            && self.from.is_none_or(|from| session.start_time >= from)
            && self.to.is_none_or(|to| session.start_time <= to)
    }
}

/// Which intervals to list. Bounds apply to `timestamp`, inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl IntervalQuery {
    pub fn matches(&self, interval: &FocusInterval) -> bool {
        self.from.is_none_or(|from| interval.timestamp >= from)
            && self.to.is_none_or(|to| interval.timestamp <= to)
    }
}

/// Durable append/update storage for sessions and intervals.
pub trait RecordStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Inserts a session, or updates the window title of an existing one.
    fn append_or_update_session(&mut self, session: &Session) -> Result<(), Self::Error>;

    /// Sets the end time of an open session.
    ///
    /// Fails if the session is unknown or already closed; an end time is never
    /// overwritten.
    fn close_session(&mut self, id: &SessionId, end_time: DateTime<Utc>) -> Result<(), Self::Error>;

    /// Lists matching sessions ordered by start time.
    fn list_sessions(&self, query: &SessionQuery) -> Result<Vec<Session>, Self::Error>;

    /// Returns the open session for `stream`, if any.
    fn open_session(&self, stream: &StreamId) -> Result<Option<Session>, Self::Error>;

    /// Inserts an interval, replacing any earlier version with the same ID.
    fn append_interval(&mut self, interval: &FocusInterval) -> Result<(), Self::Error>;

    /// Lists matching intervals ordered by timestamp.
    fn list_intervals(&self, query: &IntervalQuery) -> Result<Vec<FocusInterval>, Self::Error>;
}

/// Errors from [`MemoryStore`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryStoreError {
    #[error("session {0} is not open")]
    SessionNotOpen(SessionId),
}

/// In-memory [`RecordStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sessions: Vec<Session>,
    intervals: Vec<FocusInterval>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All sessions in insertion order.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }
}

impl RecordStore for MemoryStore {
    type Error = MemoryStoreError;

    fn append_or_update_session(&mut self, session: &Session) -> Result<(), Self::Error> {
        match self.sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) if !existing.is_open() => {
                return Err(MemoryStoreError::SessionNotOpen(session.id.clone()));
            }
            Some(existing) => existing.window_title.clone_from(&session.window_title),
            None => self.sessions.push(session.clone()),
        }
        Ok(())
    }

    fn close_session(&mut self, id: &SessionId, end_time: DateTime<Utc>) -> Result<(), Self::Error> {
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == *id && s.is_open())
            .ok_or_else(|| MemoryStoreError::SessionNotOpen(id.clone()))?;
        session.end_time = Some(end_time);
        Ok(())
    }

    fn list_sessions(&self, query: &SessionQuery) -> Result<Vec<Session>, Self::Error> {
        let mut sessions: Vec<_> = self
            .sessions
            .iter()
            .filter(|s| query.matches(s))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.start_time);
        Ok(sessions)
    }

    fn open_session(&self, stream: &StreamId) -> Result<Option<Session>, Self::Error> {
        Ok(self
            .sessions
            .iter()
            .rev()
            .find(|s| s.stream == *stream && s.is_open())
            .cloned())
    }

    fn append_interval(&mut self, interval: &FocusInterval) -> Result<(), Self::Error> {
        match self.intervals.iter_mut().find(|i| i.id == interval.id) {
            Some(existing) => *existing = interval.clone(),
            None => self.intervals.push(interval.clone()),
        }
        Ok(())
    }

    fn list_intervals(&self, query: &IntervalQuery) -> Result<Vec<FocusInterval>, Self::Error> {
        let mut intervals: Vec<_> = self
            .intervals
            .iter()
            .filter(|i| query.matches(i))
            .cloned()
            .collect();
        intervals.sort_by_key(|i| i.timestamp);
        Ok(intervals)
    }
}
