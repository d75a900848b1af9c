//! CLI subcommand implementations.

pub mod focus;
pub mod import;
pub mod ingest;
pub mod recompute;
pub mod report;
pub mod sessions;
pub mod status;
pub mod util;
