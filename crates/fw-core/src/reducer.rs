//! Session reduction.
//!
//! Turns a chronological stream of foreground-app observations into
//! sessions. Each watcher stream gets its own [`SessionReducer`]; the reducer
//! remembers only the currently open session and hands everything else to
//! the record store.
//!
//! # Rules
//!
//! For each observation, exactly one [`SessionAction`] is produced:
//!
//! - nothing open: open a session for the observed app
//! - a different app is open: close it at `observed_at`, open the new app
//! - the same app is open: keep it; a new non-null window title is written in
//!   place, anything else (including redelivery) changes nothing
//!
//! A title change never splits a session.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::session::{Observation, Session};
use crate::store::RecordStore;
use crate::types::{AppName, SessionId, StreamId};

/// A logic fault the reducer refuses to paper over.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Closing the open session would give it a negative duration.
    #[error("cannot close session {id} at {end_time}: it started at {start_time}")]
    EndBeforeStart {
        id: SessionId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    },
}

/// Failure while recording an observation into a store.
#[derive(Debug, Error)]
pub enum RecordError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error("record store failed")]
    Store(#[source] E),
}

/// A session that the reducer has closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSession {
    pub id: SessionId,
    pub end_time: DateTime<Utc>,
}

/// What one observation does to the session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// No session was open; `session` starts now.
    Open { session: Session },
    /// Another app took the foreground.
    Switch {
        closed: ClosedSession,
        opened: Session,
    },
    /// Same app, new window title.
    UpdateTitle {
        id: SessionId,
        window_title: String,
    },
    /// Same app, nothing changed.
    Continue { id: SessionId },
}

impl SessionAction {
    /// Returns true if the action leaves the store untouched.
    pub const fn is_noop(&self) -> bool {
        matches!(self, Self::Continue { .. })
    }
}

/// The single open session a reducer tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenSession {
    id: SessionId,
    app_name: AppName,
    window_title: Option<String>,
    start_time: DateTime<Utc>,
}

impl From<Session> for OpenSession {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            app_name: session.app_name,
            window_title: session.window_title,
            start_time: session.start_time,
        }
    }
}

/// Per-stream session state machine.
///
/// Not shared between threads by itself. Concurrent watchers feeding the same
/// stream must serialize access, e.g. through a `Mutex<SessionReducer>`.
#[derive(Debug, Clone)]
pub struct SessionReducer {
    stream: StreamId,
    open: Option<OpenSession>,
}

impl SessionReducer {
    /// Creates a reducer with no open session.
    pub const fn new(stream: StreamId) -> Self {
        Self { stream, open: None }
    }

    /// Creates a reducer that continues from a session left open in the store.
    ///
    /// Sessions that are already closed are ignored.
    pub fn resume(stream: StreamId, open: Option<Session>) -> Self {
        let open = open.filter(Session::is_open).map(OpenSession::from);
        Self { stream, open }
    }

    pub const fn stream(&self) -> &StreamId {
        &self.stream
    }

    /// ID of the open session, if any.
    pub fn open_session_id(&self) -> Option<&SessionId> {
        self.open.as_ref().map(|open| &open.id)
    }

    /// Works out what `obs` does without changing any state.
    pub fn decide(&self, obs: &Observation) -> Result<SessionAction, InvariantViolation> {
        let Some(open) = &self.open else {
            return Ok(SessionAction::Open {
                session: self.new_session(obs),
            });
        };

        if open.app_name != obs.app {
            if obs.observed_at < open.start_time {
                return Err(InvariantViolation::EndBeforeStart {
                    id: open.id.clone(),
                    start_time: open.start_time,
                    end_time: obs.observed_at,
                });
            }
            return Ok(SessionAction::Switch {
                closed: ClosedSession {
                    id: open.id.clone(),
                    end_time: obs.observed_at,
                },
                opened: self.new_session(obs),
            });
        }

        match &obs.window_title {
            Some(title) if open.window_title.as_ref() != Some(title) => {
                Ok(SessionAction::UpdateTitle {
                    id: open.id.clone(),
                    window_title: title.clone(),
                })
            }
            _ => Ok(SessionAction::Continue {
                id: open.id.clone(),
            }),
        }
    }

    /// Commits an action previously returned by [`decide`](Self::decide).
    pub fn apply(&mut self, action: &SessionAction) {
        match action {
            SessionAction::Open { session }
            | SessionAction::Switch {
                opened: session, ..
            } => {
                self.open = Some(OpenSession::from(session.clone()));
            }
            SessionAction::UpdateTitle { window_title, .. } => {
                if let Some(open) = &mut self.open {
                    open.window_title = Some(window_title.clone());
                }
            }
            SessionAction::Continue { .. } => {}
        }
    }

    /// Decides and commits in one step.
    pub fn observe(&mut self, obs: &Observation) -> Result<SessionAction, InvariantViolation> {
        let action = self.decide(obs)?;
        self.apply(&action);
        Ok(action)
    }

    fn new_session(&self, obs: &Observation) -> Session {
        Session::open_after(
            self.open.as_ref().map(|open| &open.id),
            self.stream.clone(),
            obs.app.clone(),
            obs.window_title.clone(),
            obs.observed_at,
        )
    }

    fn open_as_session(&self) -> Option<Session> {
        self.open.as_ref().map(|open| Session {
            id: open.id.clone(),
            stream: self.stream.clone(),
            app_name: open.app_name.clone(),
            window_title: open.window_title.clone(),
            start_time: open.start_time,
            end_time: None,
        })
    }
}

/// Feeds one observation through `reducer` and writes the result to `store`.
///
/// The reducer only advances after the store accepted the write, so a store
/// failure leaves both sides as they were before the call (apart from a
/// close that succeeded before a failed open, which the store reports).
pub fn record_observation<S: RecordStore>(
    reducer: &mut SessionReducer,
    store: &mut S,
    obs: &Observation,
) -> Result<SessionAction, RecordError<S::Error>> {
    let action = reducer.decide(obs)?;

    match &action {
        SessionAction::Open { session } => {
            store
                .append_or_update_session(session)
                .map_err(RecordError::Store)?;
        }
        SessionAction::Switch { closed, opened } => {
            store
                .close_session(&closed.id, closed.end_time)
                .map_err(RecordError::Store)?;
            store
                .append_or_update_session(opened)
                .map_err(RecordError::Store)?;
        }
        SessionAction::UpdateTitle { window_title, .. } => {
            if let Some(mut session) = reducer.open_as_session() {
                session.window_title = Some(window_title.clone());
                store
                    .append_or_update_session(&session)
                    .map_err(RecordError::Store)?;
            }
        }
        SessionAction::Continue { .. } => {}
    }

    tracing::debug!(stream = %reducer.stream(), app = %obs.app, ?action, "recorded observation");
    reducer.apply(&action);
    Ok(action)
}
