//! CLI commands and argument parsing

use crate::api::LogKind;
use crate::config::DEFAULT_SECTION;
use crate::output::OutputFormat;
use crate::state::StartMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line client for the access-control management API
#[derive(Parser, Debug)]
#[command(name = "accessctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML, default ~/.accessctl.yaml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Configuration section to use
    #[arg(short, long, global = true, default_value = DEFAULT_SECTION)]
    pub section: String,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Fields to print (comma-separated, dot paths allowed)
    #[arg(long, global = true, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Omit the header row of csv/tsv output
    #[arg(long, global = true)]
    pub no_header: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read access or admin logs
    Log(LogArgs),

    /// Connectors
    Connector {
        #[command(subcommand)]
        command: ConnectorCommand,
    },

    /// Certificates
    Cert {
        #[command(subcommand)]
        command: ListCommand,
    },

    /// Applications
    App {
        #[command(subcommand)]
        command: ListCommand,
    },

    /// Identity providers
    Idp {
        #[command(subcommand)]
        command: ListCommand,
    },

    /// User directories
    Directory {
        #[command(subcommand)]
        command: ListCommand,
    },
}

/// Arguments of `log`
#[derive(Args, Debug)]
pub struct LogArgs {
    /// Which log to read
    #[arg(value_enum)]
    pub kind: LogKind,

    #[command(flatten)]
    pub tail: TailArgs,

    /// Window start: epoch ms, RFC 3339, or a relative age such as 15m, 2h, 1d
    #[arg(long, conflicts_with = "tail")]
    pub since: Option<String>,

    /// Window end: epoch ms or RFC 3339 (default: now)
    #[arg(long, conflicts_with = "tail")]
    pub until: Option<String>,
}

/// Connector subcommands
#[derive(Subcommand, Debug)]
pub enum ConnectorCommand {
    /// List connectors, or follow their status with --tail
    List(TailArgs),
}

/// Catalog subcommands
#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ListCommand {
    /// List every object
    List,
}

/// Live tail options
#[derive(Args, Debug, Clone, Default)]
pub struct TailArgs {
    /// Keep polling for new items until interrupted
    #[arg(long)]
    pub tail: bool,

    /// Seconds between polls when nothing new arrived
    #[arg(long, requires = "tail", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Start from the oldest item the server retains
    #[arg(long, requires = "tail", conflicts_with = "resume")]
    pub from_start: bool,

    /// Resume from the token printed when a previous tail ended
    #[arg(long, requires = "tail")]
    pub resume: Option<String>,

    /// Fail instead of warning when server history no longer reaches the cursor
    #[arg(long, requires = "tail")]
    pub strict: bool,

    /// Stop after printing this many items
    #[arg(long, requires = "tail")]
    pub max_items: Option<u64>,
}

impl TailArgs {
    /// Where the tail starts, given the command's default
    pub fn start_mode(&self, default: StartMode) -> StartMode {
        if let Some(token) = &self.resume {
            StartMode::Resume(token.clone())
        } else if self.from_start {
            StartMode::FromStart
        } else {
            default
        }
    }
}
