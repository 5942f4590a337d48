//! Management API module
//!
//! Typed access to the resources of the access-control API.
//!
//! # Overview
//!
//! The api module provides:
//! - `ApiClient` - Authenticated client for single-shot listings
//! - `LogSource` / `ConnectorSource` - Poll sources for the live tail
//! - `Resource` / `LogKind` - The endpoints the CLI knows about
//!
//! Tail sources issue exactly one request per fetch with internal retries
//! disabled; retry and backoff belong to the poll engine.

mod client;
mod resources;
mod sources;

pub use client::{ApiClient, DEFAULT_PAGE_SIZE};
pub use resources::{connector_decoder, log_decoder, LogKind, Resource};
pub use sources::{ConnectorSource, LogSource};
