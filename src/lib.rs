// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # accessctl
//!
//! Command-line client and library for a cloud access-control management
//! API, built around a live tail of audit logs and connector status.
//!
//! ## Features
//!
//! - **Live tail**: Poll a log or connector listing and print only new items
//! - **Resumable cursor**: Continue a previous tail from its printed token
//! - **Deduplication**: Overlapping pages never print an item twice
//! - **Backoff**: Transient failures are retried with capped backoff
//! - **Catalog listings**: Certificates, apps, identity providers, directories
//! - **Output**: JSON lines, CSV or TSV with selectable fields
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use accessctl::api::{ApiClient, LogKind, LogSource};
//! use accessctl::engine::{PollConfig, PollEngine};
//! use accessctl::output::{build_writer, OutputFormat};
//! use accessctl::state::{CursorTracker, StartMode};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> accessctl::Result<()> {
//!     let profile = accessctl::config::load_profile(None, "default")?;
//!     let http = accessctl::http::HttpClient::with_auth(profile.http_config(), profile.auth.clone())?;
//!     let mut source = LogSource::new(ApiClient::new(http).into(), LogKind::Access);
//!
//!     let tracker = CursorTracker::initialize(&StartMode::FromNow, chrono::Utc::now().timestamp_millis());
//!     let mut engine = PollEngine::new(PollConfig::default(), tracker);
//!     let mut sink = build_writer(OutputFormat::Json, Vec::new(), true, std::io::stdout());
//!
//!     let cancel = CancellationToken::new();
//!     let summary = engine.run(&mut source, sink.as_mut(), &cancel).await?;
//!     println!("{} new events", summary.items_emitted);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          CLI (clap)                             │
//! │     log <access|admin> [--tail]   connector list [--tail]       │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┴──────────────────────────────────┐
//! │  PollEngine: Fetching → IdleWait / BackoffWait → ... → Stopped  │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │   API    │   HTTP    │    Decode     │   State   │   Output    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Logs     │ Retry     │ Records       │ Cursor    │ JSON lines  │
//! │ Catalog  │ Rate Limit│ Timestamps    │ Dedup     │ CSV / TSV   │
//! │ Sources  │ Auth      │ Meta          │           │             │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases
pub mod error;

/// Common types used throughout the crate
pub mod types;

/// Authentication
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Pagination for single-shot listings
pub mod pagination;

/// Response decoding
pub mod decode;

/// Cursor tracking and deduplication
pub mod state;

/// Output sinks
pub mod output;

/// Poll loop engine
pub mod engine;

/// Management API resources and tail sources
pub mod api;

/// Profile configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use engine::{BatchSource, PollConfig, PollEngine, PollSummary};
pub use state::{CursorTracker, PollCursor, StartMode};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
