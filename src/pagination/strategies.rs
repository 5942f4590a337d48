//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{check_stop_condition, NextPage, PaginationState, Paginator, StopCondition};
use crate::decode::lookup_path;
use serde_json::Value;
use std::collections::HashMap;

// ============================================================================
// Cursor Pagination
// ============================================================================

/// Cursor-based pagination
///
/// Uses an opaque cursor from the response to fetch the next page, e.g.
/// `?cursor=abc123`. Log listings paginate this way.
#[derive(Debug, Clone)]
pub struct CursorPaginator {
    /// Query parameter name for cursor
    pub cursor_param: String,
    /// Dot path to the cursor in the response
    pub cursor_path: String,
    /// Stop condition
    pub stop_condition: StopCondition,
}

impl CursorPaginator {
    /// Create a new cursor paginator
    pub fn new(
        cursor_param: impl Into<String>,
        cursor_path: impl Into<String>,
        stop_condition: StopCondition,
    ) -> Self {
        Self {
            cursor_param: cursor_param.into(),
            cursor_path: cursor_path.into(),
            stop_condition,
        }
    }
}

impl Paginator for CursorPaginator {
    fn initial_params(&self, state: &PaginationState) -> HashMap<String, String> {
        let mut params = HashMap::new();
        if let Some(cursor) = &state.cursor {
            params.insert(self.cursor_param.clone(), cursor.clone());
        }
        params
    }

    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_page(records_count);

        if check_stop_condition(&self.stop_condition, body, records_count, state) {
            state.mark_done();
            return NextPage::Done;
        }

        let cursor = match lookup_path(body, &self.cursor_path) {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        // A repeated cursor would loop forever
        if cursor.is_empty() || state.cursor.as_deref() == Some(cursor.as_str()) {
            state.mark_done();
            return NextPage::Done;
        }

        state.cursor = Some(cursor.clone());
        NextPage::with_param(&self.cursor_param, cursor)
    }
}

// ============================================================================
// Offset Pagination
// ============================================================================

/// Offset-based pagination
///
/// Uses offset and limit parameters, e.g. `?offset=100&limit=50`. A page
/// shorter than the limit is the last one.
#[derive(Debug, Clone)]
pub struct OffsetPaginator {
    /// Query parameter name for offset
    pub offset_param: String,
    /// Query parameter name for limit
    pub limit_param: String,
    /// Number of records per page
    pub limit_value: u32,
    /// Stop condition
    pub stop_condition: StopCondition,
}

impl OffsetPaginator {
    /// Create a new offset paginator
    pub fn new(
        offset_param: impl Into<String>,
        limit_param: impl Into<String>,
        limit_value: u32,
        stop_condition: StopCondition,
    ) -> Self {
        Self {
            offset_param: offset_param.into(),
            limit_param: limit_param.into(),
            limit_value,
            stop_condition,
        }
    }

    fn params(&self, offset: u64) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert(self.offset_param.clone(), offset.to_string());
        params.insert(self.limit_param.clone(), self.limit_value.to_string());
        params
    }
}

impl Paginator for OffsetPaginator {
    fn initial_params(&self, state: &PaginationState) -> HashMap<String, String> {
        self.params(state.offset)
    }

    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_page(records_count);

        if check_stop_condition(&self.stop_condition, body, records_count, state) {
            state.mark_done();
            return NextPage::Done;
        }

        if records_count < self.limit_value as usize {
            state.mark_done();
            return NextPage::Done;
        }

        state.offset += u64::from(self.limit_value);
        NextPage::Continue(self.params(state.offset))
    }
}
