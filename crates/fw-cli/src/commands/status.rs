//! Status command for showing watcher health and the open session.

use std::io::Write;

use anyhow::{Context, Result};
use fw_core::{RecordStore, StreamId, format_timestamp};
use fw_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    let stream = StreamId::new(config.stream.as_str()).context("invalid stream in config")?;
    let activity = db.last_activity().context("failed to load watcher activity")?;

    writeln!(writer, "focuswatch status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Stream: {stream}")?;

    match db.open_session(&stream)? {
        Some(session) => {
            let title = session
                .window_title
                .as_deref()
                .map(|title| format!(" ({title})"))
                .unwrap_or_default();
            writeln!(
                writer,
                "Open session: {}{title} since {}",
                session.app_name,
                format_timestamp(session.start_time)
            )?;
        }
        None => writeln!(writer, "Open session: none")?,
    }

    if activity.is_empty() {
        writeln!(writer, "No watcher reports recorded.")?;
        return Ok(());
    }

    writeln!(writer, "Watchers:")?;
    for source in activity {
        writeln!(
            writer,
            "- {}: {}",
            source.source,
            format_timestamp(source.last_seen)
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};
    use fw_core::{AppName, FocusPing, FocusState, Session};
    use insta::assert_snapshot;

    fn config(db_path: std::path::PathBuf) -> Config {
        Config {
            database_path: db_path,
            ..Config::default()
        }
    }

    #[test]
    fn status_command_outputs_open_session_and_watchers() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("fw.db");
        let mut db = Database::open(&db_path).unwrap();

        let session = Session::open(
            StreamId::new("default").unwrap(),
            AppName::new("Code").unwrap(),
            Some("main.rs".to_string()),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        );
        db.append_or_update_session(&session).unwrap();
        db.insert_pings(&[FocusPing {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 2, 0).unwrap(),
            state: FocusState::Focused,
            duration_secs: None,
        }])
        .unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, &config(db_path.clone())).unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&db_path.display().to_string(), "[TEMP]/fw.db");
        assert_snapshot!(output, @r"
        focuswatch status
        Database: [TEMP]/fw.db
        Stream: default
        Open session: Code (main.rs) since 2025-01-01T00:00:00.000Z
        Watchers:
        - app: 2025-01-01T00:00:00.000Z
        - focus: 2025-01-01T00:02:00.000Z
        ");
    }

    #[test]
    fn status_command_on_empty_database() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        run(&mut output, &db, &config("fw.db".into())).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Open session: none"));
        assert!(output.ends_with("No watcher reports recorded.\n"));
    }
}
