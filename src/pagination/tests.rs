//! Tests for pagination module

use super::*;
use serde_json::json;

// ============================================================================
// NextPage / State Tests
// ============================================================================

#[test]
fn test_next_page_with_param() {
    let next = NextPage::with_param("cursor", "abc");
    assert!(!next.is_done());

    let NextPage::Continue(params) = next else {
        panic!("Expected Continue");
    };
    assert_eq!(params.get("cursor"), Some(&"abc".to_string()));
    assert!(NextPage::Done.is_done());
}

#[test]
fn test_pagination_state_default() {
    let mut state = PaginationState::new();
    assert_eq!(state.offset, 0);
    assert!(state.cursor.is_none());
    assert!(!state.done);

    state.add_page(10);
    state.add_page(5);
    assert_eq!(state.pages, 2);
    assert_eq!(state.total_fetched, 15);
}

// ============================================================================
// Stop Condition Tests
// ============================================================================

#[test]
fn test_stop_condition_empty_page() {
    let state = PaginationState::new();
    let body = json!({});
    assert!(check_stop_condition(&StopCondition::EmptyPage, &body, 0, &state));
    assert!(!check_stop_condition(&StopCondition::EmptyPage, &body, 3, &state));
}

#[test]
fn test_stop_condition_null_next() {
    let state = PaginationState::new();
    let cond = StopCondition::field("meta.next", serde_json::Value::Null);

    assert!(check_stop_condition(&cond, &json!({"meta": {"next": null}}), 5, &state));
    assert!(!check_stop_condition(&cond, &json!({"meta": {"next": "/p2"}}), 5, &state));
    // Absent field keeps going; the short-page rule still applies
    assert!(!check_stop_condition(&cond, &json!({}), 5, &state));
}

#[test]
fn test_stop_condition_total_count() {
    let mut state = PaginationState::new();
    let cond = StopCondition::total_count("meta.total_count");
    let body = json!({"meta": {"total_count": 75}});

    state.add_page(50);
    assert!(!check_stop_condition(&cond, &body, 50, &state));
    state.add_page(25);
    assert!(check_stop_condition(&cond, &body, 25, &state));
}

// ============================================================================
// Cursor Paginator Tests
// ============================================================================

#[test]
fn test_cursor_paginator_initial_params() {
    let paginator = CursorPaginator::new("cursor", "meta.next_cursor", StopCondition::EmptyPage);
    let mut state = PaginationState::new();
    assert!(paginator.initial_params(&state).is_empty());

    state.cursor = Some("c1".to_string());
    let params = paginator.initial_params(&state);
    assert_eq!(params.get("cursor"), Some(&"c1".to_string()));
}

#[test]
fn test_cursor_paginator_continues() {
    let paginator = CursorPaginator::new("cursor", "meta.next_cursor", StopCondition::EmptyPage);
    let mut state = PaginationState::new();
    let body = json!({"data": [1, 2], "meta": {"next_cursor": "c2"}});

    let next = paginator.process_response(&body, 2, &mut state);
    assert_eq!(next, NextPage::with_param("cursor", "c2"));
    assert_eq!(state.cursor.as_deref(), Some("c2"));
}

#[test]
fn test_cursor_paginator_stops() {
    let paginator = CursorPaginator::new("cursor", "meta.next_cursor", StopCondition::EmptyPage);

    let mut state = PaginationState::new();
    let next = paginator.process_response(&json!({"meta": {"next_cursor": null}}), 2, &mut state);
    assert!(next.is_done());
    assert!(state.done);

    let mut state = PaginationState::new();
    let next = paginator.process_response(&json!({"meta": {"next_cursor": "c"}}), 0, &mut state);
    assert!(next.is_done());

    // Same cursor twice means the server is not advancing
    let mut state = PaginationState::new();
    let body = json!({"meta": {"next_cursor": "c"}});
    assert!(!paginator.process_response(&body, 1, &mut state).is_done());
    assert!(paginator.process_response(&body, 1, &mut state).is_done());
}

// ============================================================================
// Offset Paginator Tests
// ============================================================================

#[test]
fn test_offset_paginator_initial_params() {
    let paginator = OffsetPaginator::new("offset", "limit", 50, StopCondition::EmptyPage);
    let state = PaginationState::new();

    let params = paginator.initial_params(&state);
    assert_eq!(params.get("offset"), Some(&"0".to_string()));
    assert_eq!(params.get("limit"), Some(&"50".to_string()));
}

#[test]
fn test_offset_paginator_continues() {
    let paginator = OffsetPaginator::new("offset", "limit", 50, StopCondition::EmptyPage);
    let mut state = PaginationState::new();

    let next = paginator.process_response(&json!({"objects": []}), 50, &mut state);

    assert_eq!(state.offset, 50);
    assert_eq!(state.total_fetched, 50);
    let NextPage::Continue(params) = next else {
        panic!("Expected Continue");
    };
    assert_eq!(params.get("offset"), Some(&"50".to_string()));
    assert_eq!(params.get("limit"), Some(&"50".to_string()));
}

#[test]
fn test_offset_paginator_stops_on_partial_page() {
    let paginator = OffsetPaginator::new("offset", "limit", 50, StopCondition::EmptyPage);
    let mut state = PaginationState::new();

    let next = paginator.process_response(&json!({}), 25, &mut state);

    assert!(next.is_done());
    assert!(state.done);
}

#[test]
fn test_offset_paginator_stops_on_null_next() {
    let paginator = OffsetPaginator::new(
        "offset",
        "limit",
        2,
        StopCondition::field("meta.next", serde_json::Value::Null),
    );
    let mut state = PaginationState::new();

    let next = paginator.process_response(&json!({"meta": {"next": null}}), 2, &mut state);
    assert!(next.is_done());
}
