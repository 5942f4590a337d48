//! Pagination module
//!
//! Supports: Cursor, Offset
//!
//! # Overview
//!
//! Single-shot commands walk every page of a listing. Each strategy turns
//! a response into the query parameters of the next request and decides
//! when the listing is exhausted. The live tail does not paginate here;
//! its cursor lives in the poll engine.

mod strategies;
mod types;

pub use strategies::{CursorPaginator, OffsetPaginator};
pub use types::{check_stop_condition, NextPage, PaginationState, Paginator, StopCondition};

#[cfg(test)]
mod tests;
