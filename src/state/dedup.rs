//! Result deduplicator
//!
//! Some endpoints treat the lower time bound as inclusive, so consecutive
//! polls overlap on the boundary. The deduplicator remembers the keys of
//! recently emitted items and drops anything older than the cursor.
//! Cursor monotonicity means nothing older than the boundary can be new,
//! so the window only has to cover items at or after it.
//!
//! Snapshot resources re-list every record on each fetch, old timestamps
//! included. Those are compared per record identity instead: a record is
//! new whenever its content differs from what was last emitted for it.

use super::types::Item;
use std::collections::{HashMap, HashSet, VecDeque};

/// Default number of item keys kept in the seen-window
pub const DEFAULT_WINDOW: usize = 4096;

/// Items that survived a merge, plus what was discarded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Items not emitted before, in source order
    pub items: Vec<Item>,
    /// Items dropped as already emitted
    pub duplicates: usize,
}

/// Bounded memory of emitted items
#[derive(Debug, Clone)]
pub struct Deduplicator {
    seen: HashSet<String>,
    order: VecDeque<(String, i64)>,
    capacity: usize,
    // Snapshot record identity -> digest of the content last emitted
    latest: HashMap<String, String>,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl Deduplicator {
    /// Create a deduplicator keeping at most `capacity` keys
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            seen: HashSet::with_capacity(capacity.min(DEFAULT_WINDOW)),
            order: VecDeque::with_capacity(capacity.min(DEFAULT_WINDOW)),
            capacity,
            latest: HashMap::new(),
        }
    }

    /// Number of keys currently remembered
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no keys are remembered
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether an item with this key was seen
    pub fn contains(&self, item: &Item) -> bool {
        self.seen.contains(&item.key())
    }

    /// Filter `items` down to those not emitted before.
    ///
    /// `boundary` is the position of the cursor the batch was fetched
    /// with. Items strictly older than it were emitted by an earlier poll.
    /// Kept items are remembered immediately, so a batch that repeats an
    /// item only yields it once.
    pub fn merge(&mut self, items: Vec<Item>, boundary: Option<i64>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        for item in items {
            if boundary.is_some_and(|b| item.position < b) {
                outcome.duplicates += 1;
                continue;
            }

            let key = item.key();
            if self.seen.contains(&key) {
                outcome.duplicates += 1;
                continue;
            }

            self.remember(key, item.position);
            outcome.items.push(item);
        }

        outcome
    }

    /// Filter a full snapshot down to records whose content changed.
    ///
    /// Records are matched across snapshots by id, or by their content key
    /// when they have none. No position boundary applies: a record that
    /// changed without a newer timestamp is still new.
    pub fn merge_snapshot(&mut self, items: Vec<Item>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        for item in items {
            let identity = item.id.clone().unwrap_or_else(|| item.key());
            let digest = item.digest();
            if self.latest.get(&identity) == Some(&digest) {
                outcome.duplicates += 1;
                continue;
            }

            self.latest.insert(identity, digest);
            outcome.items.push(item);
        }

        outcome
    }

    /// Forget keys of items older than `position`.
    ///
    /// Called after the cursor commits; those items can no longer come
    /// back without tripping the boundary check.
    pub fn forget_before(&mut self, position: i64) {
        let seen = &mut self.seen;
        self.order.retain(|(key, pos)| {
            let keep = *pos >= position;
            if !keep {
                seen.remove(key);
            }
            keep
        });
    }

    fn remember(&mut self, key: String, position: i64) {
        self.seen.insert(key.clone());
        self.order.push_back((key, position));

        while self.order.len() > self.capacity {
            if let Some((evicted, _)) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
    }
}
