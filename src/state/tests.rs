//! Tests for the cursor tracker and deduplicator

use super::*;
use crate::error::Error;
use pretty_assertions::assert_eq;
use serde_json::json;

fn item(id: u32, ts: i64) -> Item {
    Item::with_id(id.to_string(), ts, json!({"id": id, "ts": ts}))
}

fn ids(items: &[Item]) -> Vec<String> {
    items.iter().filter_map(|i| i.id.clone()).collect()
}

// ============================================================================
// PollCursor Tests
// ============================================================================

#[test]
fn test_cursor_from_resume_value() {
    assert_eq!(
        PollCursor::from_resume_value("1700000000000"),
        PollCursor::Position(1_700_000_000_000)
    );
    assert_eq!(
        PollCursor::from_resume_value("2024-01-01T00:00:00Z"),
        PollCursor::Position(1_704_067_200_000)
    );
    assert_eq!(
        PollCursor::from_resume_value("opaque-abc"),
        PollCursor::Token {
            token: "opaque-abc".to_string(),
            position: None
        }
    );
}

#[test]
fn test_cursor_resume_value_round_trips_position() {
    let cursor = PollCursor::Position(42);
    let value = cursor.resume_value().unwrap();
    assert_eq!(PollCursor::from_resume_value(&value), cursor);
    assert_eq!(PollCursor::Beginning.resume_value(), None);
}

#[test]
fn test_cursor_display() {
    assert_eq!(PollCursor::Beginning.to_string(), "beginning");
    assert_eq!(PollCursor::Position(5).to_string(), "position:5");
    let token = PollCursor::Token {
        token: "t".to_string(),
        position: Some(9),
    };
    assert_eq!(token.to_string(), "token:t@9");
}

// ============================================================================
// Item Tests
// ============================================================================

#[test]
fn test_item_key_prefers_id() {
    assert_eq!(item(7, 10).key(), "id:7");
}

#[test]
fn test_item_key_hashes_content_without_id() {
    let a = Item::new(10, json!({"b": 2, "a": 1}));
    let b = Item::new(10, json!({"a": 1, "b": 2}));
    let c = Item::new(11, json!({"a": 1, "b": 2}));

    assert_eq!(a.key(), b.key());
    assert_ne!(a.key(), c.key());
    assert!(a.key().starts_with("sha256:"));
}

#[test]
fn test_batch_trailing_position() {
    assert_eq!(FetchBatch::empty().trailing_position(), None);
    assert_eq!(
        FetchBatch::new(vec![item(1, 10), item(2, 30), item(3, 20)]).trailing_position(),
        Some(30)
    );
    assert_eq!(
        FetchBatch::new(vec![item(1, 10)])
            .with_high_watermark(50)
            .trailing_position(),
        Some(50)
    );
    assert_eq!(
        FetchBatch::empty().with_high_watermark(5).trailing_position(),
        Some(5)
    );
}

// ============================================================================
// CursorTracker Tests
// ============================================================================

#[test]
fn test_initialize_modes() {
    assert_eq!(
        CursorTracker::initialize(&StartMode::FromStart, 1000).current(),
        &PollCursor::Beginning
    );
    assert_eq!(
        CursorTracker::initialize(&StartMode::FromNow, 1000).current(),
        &PollCursor::Position(1000)
    );
    assert_eq!(
        CursorTracker::initialize(&StartMode::Resume("77".to_string()), 1000).current(),
        &PollCursor::Position(77)
    );
}

#[test]
fn test_advance_uses_trailing_position() {
    let mut tracker = CursorTracker::initialize(&StartMode::FromStart, 0);
    let cursor = tracker
        .advance(&FetchBatch::new(vec![item(1, 10), item(2, 11)]))
        .unwrap();
    assert_eq!(cursor, &PollCursor::Position(11));
}

#[test]
fn test_advance_prefers_server_token() {
    let mut tracker = CursorTracker::initialize(&StartMode::FromNow, 5);
    let batch = FetchBatch::new(vec![item(1, 10)]).with_token("next-1");
    tracker.advance(&batch).unwrap();

    assert_eq!(
        tracker.current(),
        &PollCursor::Token {
            token: "next-1".to_string(),
            position: Some(10)
        }
    );
}

#[test]
fn test_advance_keeps_token_when_server_omits_one() {
    let mut tracker = CursorTracker::from_cursor(PollCursor::Token {
        token: "t1".to_string(),
        position: Some(10),
    });
    tracker.advance(&FetchBatch::new(vec![item(1, 12)])).unwrap();

    assert_eq!(tracker.current().token(), Some("t1"));
    assert_eq!(tracker.current().position(), Some(12));
}

#[test]
fn test_empty_batch_keeps_cursor() {
    let mut tracker = CursorTracker::initialize(&StartMode::FromNow, 100);
    tracker.advance(&FetchBatch::empty()).unwrap();
    assert_eq!(tracker.current(), &PollCursor::Position(100));

    let mut tracker = CursorTracker::initialize(&StartMode::FromStart, 100);
    tracker.advance(&FetchBatch::empty()).unwrap();
    assert_eq!(tracker.current(), &PollCursor::Beginning);
}

#[test]
fn test_advance_rejects_regression() {
    let mut tracker = CursorTracker::from_cursor(PollCursor::Position(20));
    let err = tracker
        .advance(&FetchBatch::new(vec![item(1, 10)]))
        .unwrap_err();

    assert!(matches!(
        err,
        Error::InvalidCursorTransition {
            current: 20,
            reported: 10
        }
    ));
    assert_eq!(tracker.current(), &PollCursor::Position(20));
}

#[test]
fn test_next_cursor_does_not_commit() {
    let tracker = CursorTracker::from_cursor(PollCursor::Position(1));
    let next = tracker
        .next_cursor(&FetchBatch::new(vec![item(1, 5)]))
        .unwrap();

    assert_eq!(next, PollCursor::Position(5));
    assert_eq!(tracker.current(), &PollCursor::Position(1));
}

#[test]
fn test_cursor_is_monotonic_over_many_batches() {
    let mut tracker = CursorTracker::initialize(&StartMode::FromStart, 0);
    let batches = [
        vec![item(1, 10), item(2, 11)],
        vec![],
        vec![item(2, 11), item(3, 12)],
        vec![item(4, 12)],
        vec![item(5, 40)],
    ];

    let mut last = None;
    for items in batches {
        let position = tracker.advance(&FetchBatch::new(items)).unwrap().position();
        if let (Some(prev), Some(now)) = (last, position) {
            assert!(now >= prev);
        }
        last = position.or(last);
    }
    assert_eq!(last, Some(40));
}

#[test]
fn test_history_gap_detection() {
    let tracker = CursorTracker::from_cursor(PollCursor::Position(100));
    let batch = FetchBatch::empty().with_oldest_available(500);
    assert_eq!(tracker.history_gap(&batch), Some((100, 500)));

    let batch = FetchBatch::empty().with_oldest_available(50);
    assert_eq!(tracker.history_gap(&batch), None);

    let tracker = CursorTracker::initialize(&StartMode::FromStart, 0);
    let batch = FetchBatch::empty().with_oldest_available(500);
    assert_eq!(tracker.history_gap(&batch), None);
}

// ============================================================================
// Deduplicator Tests
// ============================================================================

#[test]
fn test_merge_overlapping_batches() {
    let mut dedup = Deduplicator::default();

    let first = dedup.merge(vec![item(1, 10), item(2, 11)], None);
    assert_eq!(ids(&first.items), vec!["1", "2"]);

    let second = dedup.merge(vec![item(2, 11), item(3, 12)], Some(11));
    assert_eq!(ids(&second.items), vec!["3"]);
    assert_eq!(second.duplicates, 1);
}

#[test]
fn test_merge_drops_items_older_than_boundary() {
    let mut dedup = Deduplicator::default();
    let outcome = dedup.merge(vec![item(1, 5), item(2, 10), item(3, 11)], Some(10));

    assert_eq!(ids(&outcome.items), vec!["2", "3"]);
    assert_eq!(outcome.duplicates, 1);
}

#[test]
fn test_merge_removes_duplicates_within_batch() {
    let mut dedup = Deduplicator::default();
    let outcome = dedup.merge(vec![item(1, 10), item(1, 10), item(2, 10)], None);

    assert_eq!(ids(&outcome.items), vec!["1", "2"]);
    assert_eq!(outcome.duplicates, 1);
}

#[test]
fn test_merge_preserves_source_order() {
    let mut dedup = Deduplicator::default();
    let outcome = dedup.merge(vec![item(3, 10), item(1, 10), item(2, 10)], None);
    assert_eq!(ids(&outcome.items), vec!["3", "1", "2"]);
}

#[test]
fn test_merge_content_hash_for_anonymous_items() {
    let mut dedup = Deduplicator::default();
    let a = Item::new(10, json!({"msg": "login"}));
    let b = Item::new(10, json!({"msg": "logout"}));

    assert_eq!(dedup.merge(vec![a.clone(), b.clone()], None).items.len(), 2);
    assert_eq!(dedup.merge(vec![a, b], Some(10)).items.len(), 0);
}

fn connector(name: &str, status: &str, checkin: i64) -> Item {
    Item::with_id(
        name,
        checkin,
        json!({"name": name, "status": status, "last_checkin": checkin}),
    )
}

#[test]
fn test_merge_snapshot_emits_changed_records_only() {
    let mut dedup = Deduplicator::default();

    let first = dedup.merge_snapshot(vec![connector("dc-1", "ok", 0), connector("dc-2", "ok", 0)]);
    assert_eq!(ids(&first.items), vec!["dc-1", "dc-2"]);

    let repeat = dedup.merge_snapshot(vec![connector("dc-1", "ok", 0), connector("dc-2", "ok", 0)]);
    assert!(repeat.items.is_empty());
    assert_eq!(repeat.duplicates, 2);

    // Offline without a fresh check-in: same timestamp, new content
    let offline =
        dedup.merge_snapshot(vec![connector("dc-1", "offline", 0), connector("dc-2", "ok", 0)]);
    assert_eq!(ids(&offline.items), vec!["dc-1"]);
    assert_eq!(offline.items[0].payload["status"], "offline");
    assert_eq!(offline.duplicates, 1);

    // Flapping back is a change too
    let back = dedup.merge_snapshot(vec![connector("dc-1", "ok", 0)]);
    assert_eq!(ids(&back.items), vec!["dc-1"]);
}

#[test]
fn test_item_digest_ignores_position() {
    let a = Item::new(10, json!({"status": "ok"}));
    let b = Item::new(99, json!({"status": "ok"}));
    assert_eq!(a.digest(), b.digest());
    assert_ne!(a.digest(), Item::new(10, json!({"status": "down"})).digest());
}

#[test]
fn test_window_is_bounded() {
    let mut dedup = Deduplicator::new(2);
    dedup.merge(vec![item(1, 1), item(2, 2), item(3, 3)], None);

    assert_eq!(dedup.len(), 2);
    assert!(!dedup.contains(&item(1, 1)));
    assert!(dedup.contains(&item(3, 3)));
}

#[test]
fn test_forget_before() {
    let mut dedup = Deduplicator::default();
    dedup.merge(vec![item(1, 10), item(2, 11), item(3, 11)], None);
    dedup.forget_before(11);

    assert_eq!(dedup.len(), 2);
    assert!(!dedup.contains(&item(1, 10)));
    assert!(dedup.contains(&item(2, 11)));
}

// ============================================================================
// PollState Tests
// ============================================================================

#[test]
fn test_poll_state_failures() {
    let mut state = PollState::new(CursorTracker::default());
    assert_eq!(state.record_failure(), 1);
    assert_eq!(state.record_failure(), 2);
    assert!(state.last_success.is_none());

    state.record_success();
    assert_eq!(state.consecutive_failures, 0);
    assert!(state.last_success.is_some());
}
