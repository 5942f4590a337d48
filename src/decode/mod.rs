//! Response decoder module
//!
//! Turns JSON response bodies into records and `FetchBatch`es.
//!
//! # Overview
//!
//! Each polled endpoint describes where its records, identifiers,
//! timestamps and continuation data live with a `BatchDecoder`. A body
//! that does not match that description is a schema error, which the
//! poll engine treats as fatal.

mod decoders;
mod types;

pub use decoders::{extract_records, lookup_path};
pub use types::BatchDecoder;
