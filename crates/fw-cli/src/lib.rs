//! focuswatch CLI library.
//!
//! This crate provides the `fw` command-line interface over `fw-core` and
//! `fw-db`.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, FocusArgs, IngestEvent, SessionsArgs};
pub use config::Config;
