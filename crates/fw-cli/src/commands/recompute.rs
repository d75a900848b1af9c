//! Rebuild focus intervals from stored pings.
//!
//! Normalization needs the whole batch: a new ping changes the duration of
//! the one before it. Intervals are upserted by ID, so rerunning is safe.

use std::io::Write;

use anyhow::{Context, Result};
use fw_core::normalize_pings;
use fw_db::Database;

/// Normalizes every stored ping and upserts the resulting intervals.
///
/// Returns the number of intervals written.
pub fn refresh_intervals(db: &mut Database) -> Result<usize> {
    let pings = db.list_pings().context("failed to load focus pings")?;
    let ping_count = pings.len();
    let intervals = normalize_pings(pings);
    let written = db
        .upsert_intervals(&intervals)
        .context("failed to store focus intervals")?;
    tracing::debug!(ping_count, written, "refreshed focus intervals");
    Ok(written)
}

/// Runs `fw recompute`.
pub fn run<W: Write>(writer: &mut W, db: &mut Database) -> Result<()> {
    let written = refresh_intervals(db)?;
    if written == 0 {
        writeln!(writer, "No focus pings to process.")?;
    } else {
        writeln!(writer, "Recomputed {written} focus interval(s).")?;
    }
    Ok(())
}
