//! Import command for watcher batches.
//!
//! Reads JSONL from stdin, one watcher event per line:
//!
//! ```text
//! {"type":"app","app":"Code","title":"main.rs","at":"2025-01-01T09:00:00Z"}
//! {"type":"focus","timestamp":"2025-01-01T09:00:00Z","state":"focused","duration":30}
//! ```
//!
//! A bad line is reported with its line number and skipped; lines before and
//! after it are still imported.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fw_core::{
    FocusPing, RecordError, RecordStore, SessionReducer, StreamId, ValidatedEvent, WatcherEvent,
    record_observation,
};
use fw_db::Database;

use crate::Config;
use crate::commands::{recompute, util};

/// A line that was not imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub line: usize,
    pub reason: String,
}

/// Outcome of an import.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub observations: usize,
    pub pings: usize,
    pub rejected: Vec<Rejected>,
}

pub fn run<W: Write>(writer: &mut W, db: &mut Database, config: &Config) -> Result<ImportSummary> {
    let stream = StreamId::new(config.stream.as_str()).context("invalid stream in config")?;
    let _lock = util::lock_store(&config.database_path)?;

    let stdin = io::stdin();
    let summary = import_events(stdin.lock(), db, &stream, Utc::now())?;

    writeln!(
        writer,
        "Imported {} app observation(s) and {} focus ping(s).",
        summary.observations, summary.pings
    )?;
    for rejected in &summary.rejected {
        writeln!(writer, "Rejected line {}: {}", rejected.line, rejected.reason)?;
    }
    Ok(summary)
}

/// Imports every line of `reader` into `db`.
///
/// App observations go through one reducer resumed from the store. Pings are
/// stored as a batch and intervals refreshed once at the end. Store failures
/// abort the import; anything wrong with a line only rejects that line.
pub fn import_events<R: BufRead>(
    reader: R,
    db: &mut Database,
    stream: &StreamId,
    received_at: DateTime<Utc>,
) -> Result<ImportSummary> {
    let open = db
        .open_session(stream)
        .context("failed to load open session")?;
    let mut reducer = SessionReducer::resume(stream.clone(), open);
    let mut summary = ImportSummary::default();
    let mut pings: Vec<FocusPing> = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("failed to read line {line_no}"))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let validated = serde_json::from_str::<WatcherEvent>(trimmed)
            .map_err(|e| format!("invalid JSON: {e}"))
            .and_then(|event| event.validate(received_at).map_err(|e| e.to_string()));

        let reject = match validated {
            Ok(ValidatedEvent::Observation(obs)) => {
                match record_observation(&mut reducer, db, &obs) {
                    Ok(_) => {
                        summary.observations += 1;
                        None
                    }
                    Err(RecordError::Invariant(violation)) => Some(violation.to_string()),
                    Err(err @ RecordError::Store(_)) => {
                        return Err(err).with_context(|| format!("failed to store line {line_no}"));
                    }
                }
            }
            Ok(ValidatedEvent::Ping(ping)) => {
                pings.push(ping);
                None
            }
            Err(reason) => Some(reason),
        };

        if let Some(reason) = reject {
            tracing::warn!(line = line_no, %reason, "rejected watcher event");
            summary.rejected.push(Rejected {
                line: line_no,
                reason,
            });
        }
    }

    if !pings.is_empty() {
        summary.pings = db.insert_pings(&pings).context("failed to store focus pings")?;
        recompute::refresh_intervals(db)?;
    }

    Ok(summary)
}
