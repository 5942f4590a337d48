//! CLI module
//!
//! Command-line interface for the management API.
//!
//! # Commands
//!
//! - `log <access|admin>` - Print a window of log events, or follow them with `--tail`
//! - `connector list` - List connectors, or follow their status with `--tail`
//! - `cert list`, `app list`, `idp list`, `directory list` - Catalog listings

mod commands;
mod runner;
mod signal;

pub use commands::{Cli, Commands, ConnectorCommand, ListCommand, LogArgs, TailArgs};
pub use runner::{parse_since, Runner};
pub use signal::ShutdownSignal;
