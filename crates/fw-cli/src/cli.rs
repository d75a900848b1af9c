//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Foreground-app and focus tracker.
///
/// Folds watcher reports into app sessions and focus intervals, and reports
/// where the time went.
#[derive(Debug, Parser)]
#[command(name = "fw", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record a single watcher report.
    Ingest {
        #[command(subcommand)]
        event: IngestEvent,
    },

    /// Import watcher reports from stdin, one JSON object per line.
    Import,

    /// Rebuild focus intervals from all stored pings.
    Recompute,

    /// Summarize app usage and focus for a period.
    Report {
        /// Current week (default).
        #[arg(long, group = "period")]
        week: bool,

        /// Previous week.
        #[arg(long, group = "period")]
        last_week: bool,

        /// Today.
        #[arg(long, group = "period")]
        day: bool,

        /// Yesterday.
        #[arg(long, group = "period")]
        last_day: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Browse app sessions.
    Sessions(SessionsArgs),

    /// Browse focus intervals and streaks.
    Focus(FocusArgs),

    /// Show watcher health and the open session.
    Status,
}

/// Watcher reports that can be ingested.
#[derive(Debug, Subcommand)]
pub enum IngestEvent {
    /// Record that an app is in the foreground.
    App {
        /// Application name.
        #[arg(long)]
        app: String,

        /// Focused window title.
        #[arg(long)]
        title: Option<String>,

        /// Observation time (RFC 3339). Defaults to now.
        #[arg(long)]
        at: Option<String>,

        /// Watcher stream. Defaults to the configured stream.
        #[arg(long)]
        stream: Option<String>,
    },

    /// Record a focus ping from the eye watcher.
    Focus {
        /// `focused` or `unfocused`.
        #[arg(long)]
        state: String,

        /// Ping time (RFC 3339). Defaults to now.
        #[arg(long)]
        at: Option<String>,

        /// Duration in seconds. Filled in from the next ping when omitted.
        #[arg(long, allow_negative_numbers = true)]
        duration: Option<f64>,
    },
}

/// Arguments for `fw sessions`.
#[derive(Debug, Args)]
pub struct SessionsArgs {
    /// Case-insensitive match on app name or window title.
    #[arg(short, long)]
    pub query: Option<String>,

    /// Earliest start (RFC 3339, YYYY-MM-DD, or e.g. '2 hours ago').
    #[arg(long)]
    pub from: Option<String>,

    /// Latest start. A bare date includes that whole day.
    #[arg(long)]
    pub to: Option<String>,

    /// Hide sessions shorter than this many minutes.
    #[arg(long, default_value_t = 0)]
    pub min_minutes: i64,

    /// Only these apps; also draws a timeline lane per app.
    #[arg(long = "app")]
    pub apps: Vec<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `fw focus`.
#[derive(Debug, Args)]
pub struct FocusArgs {
    /// Earliest interval (RFC 3339, YYYY-MM-DD, or e.g. '2 hours ago').
    #[arg(long)]
    pub from: Option<String>,

    /// Latest interval. A bare date includes that whole day.
    #[arg(long)]
    pub to: Option<String>,

    /// Hide intervals shorter than this many minutes.
    #[arg(long, default_value_t = 0)]
    pub min_minutes: i64,

    /// Hide focused intervals.
    #[arg(long)]
    pub no_focused: bool,

    /// Hide unfocused intervals.
    #[arg(long)]
    pub no_unfocused: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}
