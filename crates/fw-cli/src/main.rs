use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fw_cli::commands::{focus, import, ingest, recompute, report, sessions, status};
use fw_cli::{Cli, Commands, Config, IngestEvent};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(fw_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = fw_db::Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let mut stdout = io::stdout().lock();

    match command {
        Commands::Ingest { event } => match event {
            IngestEvent::App {
                app,
                title,
                at,
                stream,
            } => {
                ingest::ingest_app(
                    &mut db,
                    &config,
                    app,
                    title.as_deref(),
                    at.as_deref(),
                    stream.as_deref(),
                )?;
            }
            IngestEvent::Focus {
                state,
                at,
                duration,
            } => {
                ingest::ingest_focus(&mut db, &config, state, at.as_deref(), *duration)?;
            }
        },
        Commands::Import => {
            import::run(&mut stdout, &mut db, &config)?;
        }
        Commands::Recompute => {
            recompute::run(&mut stdout, &mut db)?;
        }
        Commands::Report {
            week: _,
            last_week,
            day,
            last_day,
            json,
        } => {
            let period = if *last_week {
                report::Period::LastWeek
            } else if *day {
                report::Period::Day
            } else if *last_day {
                report::Period::LastDay
            } else {
                report::Period::Week
            };
            report::run(&db, &config, period, *json)?;
        }
        Commands::Sessions(args) => sessions::run(&mut stdout, &db, args)?,
        Commands::Focus(args) => focus::run(&mut stdout, &db, args)?,
        Commands::Status => status::run(&mut stdout, &db, &config)?,
    }

    Ok(())
}
