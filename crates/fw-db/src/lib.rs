//! Storage layer for focuswatch.
//!
//! Provides persistence for app sessions, raw focus pings and normalized
//! focus intervals using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond
//! precision and a `Z` suffix (e.g., `2024-01-15T10:30:00.000Z`), so
//! lexicographic ordering matches chronological ordering.
//!
//! ## Pings and Intervals
//!
//! Raw pings are kept as received, with a nullable duration. Intervals are
//! derived from them by `fw_core::normalize_pings` and upserted by ID, so a
//! recompute after more pings arrive replaces the earlier durations.

use std::path::Path;

use chrono::{DateTime, Utc};
use fw_core::{
    AppName, FocusInterval, FocusPing, FocusState, IntervalId, IntervalQuery, RecordStore, Session,
    SessionId, SessionQuery, StreamId, format_timestamp,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for record {record_id}: {timestamp}")]
    TimestampParse {
        record_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored value does not satisfy the domain type it maps to.
    #[error("invalid value for record {record_id}: {message}")]
    InvalidValue { record_id: String, message: String },
    /// Tried to close a session that is unknown or already closed.
    #[error("session {0} is not open")]
    SessionNotOpen(SessionId),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Latest activity seen from one watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceActivity {
    /// `app` or `focus`.
    pub source: &'static str,
    pub last_seen: DateTime<Utc>,
}

struct SessionRow {
    id: String,
    stream: String,
    app_name: String,
    window_title: Option<String>,
    start_time: String,
    end_time: Option<String>,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            stream: row.get(1)?,
            app_name: row.get(2)?,
            window_title: row.get(3)?,
            start_time: row.get(4)?,
            end_time: row.get(5)?,
        })
    }

    fn into_session(self) -> Result<Session, DbError> {
        let start_time = parse_timestamp(&self.start_time, &self.id)?;
        let end_time = self
            .end_time
            .as_deref()
            .map(|end| parse_timestamp(end, &self.id))
            .transpose()?;
        Ok(Session {
            stream: StreamId::new(self.stream).map_err(|e| invalid(&self.id, &e))?,
            app_name: AppName::new(self.app_name).map_err(|e| invalid(&self.id, &e))?,
            window_title: self.window_title,
            start_time,
            end_time,
            id: SessionId::new(self.id.clone()).map_err(|e| invalid(&self.id, &e))?,
        })
    }
}

struct FocusRow {
    id: String,
    timestamp: String,
    state: String,
    duration_secs: Option<i64>,
}

impl FocusRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            state: row.get(2)?,
            duration_secs: row.get(3)?,
        })
    }

    fn parts(&self) -> Result<(DateTime<Utc>, FocusState), DbError> {
        let timestamp = parse_timestamp(&self.timestamp, &self.id)?;
        let state = self
            .state
            .parse::<FocusState>()
            .map_err(|e| invalid(&self.id, &e))?;
        Ok((timestamp, state))
    }

    fn into_ping(self) -> Result<FocusPing, DbError> {
        let (timestamp, state) = self.parts()?;
        Ok(FocusPing {
            timestamp,
            state,
            duration_secs: self.duration_secs,
        })
    }

    fn into_interval(self) -> Result<FocusInterval, DbError> {
        let (timestamp, state) = self.parts()?;
        Ok(FocusInterval {
            id: IntervalId::new(self.id.clone()).map_err(|e| invalid(&self.id, &e))?,
            timestamp,
            state,
            duration_secs: self.duration_secs.unwrap_or(0),
        })
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            -- One row per contiguous foreground-app run.
            -- end_time is NULL while the session is open.
            CREATE TABLE IF NOT EXISTS app_sessions (
                id TEXT PRIMARY KEY,
                stream TEXT NOT NULL,
                app_name TEXT NOT NULL,
                window_title TEXT,
                start_time TEXT NOT NULL,
                end_time TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_app_sessions_start ON app_sessions(start_time);
            CREATE INDEX IF NOT EXISTS idx_app_sessions_stream_open
                ON app_sessions(stream, end_time);

            -- Raw pings as received; duration_secs NULL means 'fill in'.
            CREATE TABLE IF NOT EXISTS focus_pings (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                state TEXT NOT NULL,
                duration_secs INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_focus_pings_timestamp ON focus_pings(timestamp);

            CREATE TABLE IF NOT EXISTS focus_intervals (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                state TEXT NOT NULL,
                duration_secs INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_focus_intervals_timestamp
                ON focus_intervals(timestamp);
            ",
        )?;
        Ok(())
    }

    /// Inserts a batch of raw pings, ignoring redeliveries.
    ///
    /// A ping is identified by its timestamp and state. Returns the number of
    /// newly stored pings.
    pub fn insert_pings(&mut self, pings: &[FocusPing]) -> Result<usize, DbError> {
        if pings.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO focus_pings (id, timestamp, state, duration_secs)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )?;
            for ping in pings {
                let id = IntervalId::derive(ping.timestamp, ping.state);
                inserted += stmt.execute(params![
                    id.as_str(),
                    format_timestamp(ping.timestamp),
                    ping.state.as_str(),
                    ping.duration_secs,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(received = pings.len(), inserted, "stored focus pings");
        Ok(inserted)
    }

    /// Lists all raw pings in the order they were stored.
    ///
    /// Ordering by timestamp is left to the normalizer.
    pub fn list_pings(&self) -> Result<Vec<FocusPing>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, timestamp, state, duration_secs
            FROM focus_pings
            ORDER BY rowid ASC
            ",
        )?;
        let rows = stmt.query_map([], FocusRow::from_row)?;
        let mut pings = Vec::new();
        for row in rows {
            pings.push(row?.into_ping()?);
        }
        Ok(pings)
    }

    /// Upserts a batch of intervals in one transaction.
    pub fn upsert_intervals(&mut self, intervals: &[FocusInterval]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(UPSERT_INTERVAL)?;
            for interval in intervals {
                stmt.execute(interval_params(interval))?;
            }
        }
        tx.commit()?;
        tracing::debug!(count = intervals.len(), "upserted focus intervals");
        Ok(intervals.len())
    }

    /// Latest session start and latest ping, per watcher.
    ///
    /// Watchers that never reported are omitted.
    pub fn last_activity(&self) -> Result<Vec<SourceActivity>, DbError> {
        let mut activity = Vec::new();
        let sources = [
            ("app", "SELECT MAX(COALESCE(end_time, start_time)) FROM app_sessions"),
            ("focus", "SELECT MAX(timestamp) FROM focus_pings"),
        ];
        for (source, sql) in sources {
            let last: Option<String> = self.conn.query_row(sql, [], |row| row.get(0))?;
            if let Some(last) = last {
                activity.push(SourceActivity {
                    source,
                    last_seen: parse_timestamp(&last, source)?,
                });
            }
        }
        Ok(activity)
    }
}

const UPSERT_INTERVAL: &str = "
    INSERT INTO focus_intervals (id, timestamp, state, duration_secs)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(id) DO UPDATE SET duration_secs = excluded.duration_secs
";

fn interval_params(interval: &FocusInterval) -> (String, String, &'static str, i64) {
    (
        interval.id.to_string(),
        format_timestamp(interval.timestamp),
        interval.state.as_str(),
        interval.duration_secs,
    )
}

impl RecordStore for Database {
    type Error = DbError;

    fn append_or_update_session(&mut self, session: &Session) -> Result<(), DbError> {
        let changed = self.conn.execute(
            "
            INSERT INTO app_sessions (id, stream, app_name, window_title, start_time, end_time)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET window_title = excluded.window_title
            WHERE app_sessions.end_time IS NULL
            ",
            params![
                session.id.as_str(),
                session.stream.as_str(),
                session.app_name.as_str(),
                session.window_title,
                format_timestamp(session.start_time),
                session.end_time.map(format_timestamp),
            ],
        )?;
        if changed == 0 {
            return Err(DbError::SessionNotOpen(session.id.clone()));
        }
        Ok(())
    }

    fn close_session(&mut self, id: &SessionId, end_time: DateTime<Utc>) -> Result<(), DbError> {
        let updated = self.conn.execute(
            "UPDATE app_sessions SET end_time = ?2 WHERE id = ?1 AND end_time IS NULL",
            params![id.as_str(), format_timestamp(end_time)],
        )?;
        if updated == 0 {
            return Err(DbError::SessionNotOpen(id.clone()));
        }
        Ok(())
    }

    fn list_sessions(&self, query: &SessionQuery) -> Result<Vec<Session>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, stream, app_name, window_title, start_time, end_time
            FROM app_sessions
            WHERE (?1 IS NULL OR stream = ?1)
              AND (?2 IS NULL OR start_time >= ?2)
              AND (?3 IS NULL OR start_time <= ?3)
            ORDER BY start_time ASC, rowid ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![
                query.stream.as_ref().map(StreamId::as_str),
                query.from.map(format_timestamp),
                query.to.map(format_timestamp),
            ],
            SessionRow::from_row,
        )?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?.into_session()?);
        }
        Ok(sessions)
    }

    fn open_session(&self, stream: &StreamId) -> Result<Option<Session>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, stream, app_name, window_title, start_time, end_time
                FROM app_sessions
                WHERE stream = ?1 AND end_time IS NULL
                ORDER BY start_time DESC
                LIMIT 1
                ",
                [stream.as_str()],
                SessionRow::from_row,
            )
            .optional()?;
        row.map(SessionRow::into_session).transpose()
    }

    fn append_interval(&mut self, interval: &FocusInterval) -> Result<(), DbError> {
        self.conn.execute(UPSERT_INTERVAL, interval_params(interval))?;
        Ok(())
    }

    fn list_intervals(&self, query: &IntervalQuery) -> Result<Vec<FocusInterval>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, timestamp, state, duration_secs
            FROM focus_intervals
            WHERE (?1 IS NULL OR timestamp >= ?1)
              AND (?2 IS NULL OR timestamp <= ?2)
            ORDER BY timestamp ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![query.from.map(format_timestamp), query.to.map(format_timestamp)],
            FocusRow::from_row,
        )?;
        let mut intervals = Vec::new();
        for row in rows {
            intervals.push(row?.into_interval()?);
        }
        Ok(intervals)
    }
}

fn parse_timestamp(timestamp: &str, record_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            record_id: record_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn invalid(record_id: &str, err: &impl std::fmt::Display) -> DbError {
    DbError::InvalidValue {
        record_id: record_id.to_string(),
        message: err.to_string(),
    }
}
