//! Output module
//!
//! Renders records on standard output as they become available.
//!
//! # Overview
//!
//! - `OutputSink` - The trait the poll engine emits items through
//! - `JsonLinesWriter` - One JSON object per line
//! - `DelimitedWriter` - CSV/TSV rows with an optional header
//! - `MemorySink` - Collects items in memory (library use and tests)
//!
//! Sinks write synchronously. A sink that blocks stalls the poll loop;
//! there is no buffering layer in between.

mod sink;
mod writer;

pub use sink::{MemorySink, OutputSink};
pub use writer::{build_writer, DelimitedWriter, JsonLinesWriter, OutputFormat};
