//! Ingest commands for single watcher reports.
//!
//! Each call is one short-lived process, so the session reducer is resumed
//! from the stored open session every time. The store lock keeps two
//! watchers from interleaving their read-decide-write steps.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fw_core::watch::{AppPayload, FocusPayload};
use fw_core::{
    RecordStore, SessionAction, SessionReducer, StreamId, format_timestamp, record_observation,
};
use fw_db::Database;

use crate::Config;
use crate::commands::{recompute, util};

/// Validates and records one app observation on `stream`.
pub fn record_app(
    db: &mut Database,
    stream: &StreamId,
    payload: AppPayload,
    received_at: DateTime<Utc>,
) -> Result<SessionAction> {
    let obs = payload
        .validate(received_at)
        .context("invalid app observation")?;
    let open = db
        .open_session(stream)
        .context("failed to load open session")?;
    let mut reducer = SessionReducer::resume(stream.clone(), open);
    let action = record_observation(&mut reducer, db, &obs)?;
    Ok(action)
}

/// Validates and stores one focus ping, then refreshes intervals.
///
/// Returns `false` when the ping was a redelivery.
pub fn record_focus(db: &mut Database, payload: FocusPayload) -> Result<bool> {
    let ping = payload.validate().context("invalid focus ping")?;
    let inserted = db.insert_pings(&[ping])? > 0;
    if inserted {
        recompute::refresh_intervals(db)?;
    }
    Ok(inserted)
}

/// `fw ingest app`.
pub fn ingest_app(
    db: &mut Database,
    config: &Config,
    app: &str,
    title: Option<&str>,
    at: Option<&str>,
    stream: Option<&str>,
) -> Result<SessionAction> {
    let stream = StreamId::new(stream.unwrap_or(&config.stream)).context("invalid stream")?;
    let payload = AppPayload {
        app: Some(app.to_string()),
        title: title.map(str::to_string),
        at: at.map(str::to_string),
    };

    let _lock = util::lock_store(&config.database_path)?;
    let action = record_app(db, &stream, payload, Utc::now())?;
    tracing::info!(%stream, app, ?action, "ingested app observation");
    Ok(action)
}

/// `fw ingest focus`.
pub fn ingest_focus(
    db: &mut Database,
    config: &Config,
    state: &str,
    at: Option<&str>,
    duration: Option<f64>,
) -> Result<bool> {
    let payload = FocusPayload {
        timestamp: Some(at.map_or_else(|| format_timestamp(Utc::now()), str::to_string)),
        state: Some(state.to_string()),
        duration: duration.map(serde_json::Value::from),
    };

    let _lock = util::lock_store(&config.database_path)?;
    let inserted = record_focus(db, payload)?;
    if inserted {
        tracing::info!(state, "ingested focus ping");
    } else {
        tracing::debug!(state, "focus ping already recorded");
    }
    Ok(inserted)
}
