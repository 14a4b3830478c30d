//! Unsaved-row bookkeeping.
//!
//! # Invariants
//! - Membership is a set: marking an already dirty row is a no-op.
//! - The tracker is process-local and never persisted.

use crate::model::grid::RowKey;
use std::collections::BTreeSet;

/// Rows mutated in memory since their last durable save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtyTracker {
    rows: BTreeSet<RowKey>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `row` dirty. Returns `true` when it was clean before.
    pub fn mark_dirty(&mut self, row: RowKey) -> bool {
        self.rows.insert(row)
    }

    /// Clears one row. Returns `true` when it was dirty before.
    pub fn clear(&mut self, row: RowKey) -> bool {
        self.rows.remove(&row)
    }

    pub fn clear_all(&mut self) {
        self.rows.clear();
    }

    pub fn is_dirty(&self, row: RowKey) -> bool {
        self.rows.contains(&row)
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Dirty rows in ascending order.
    pub fn rows(&self) -> impl Iterator<Item = RowKey> + '_ {
        self.rows.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::DirtyTracker;
    use crate::model::grid::RowKey;

    fn row(value: i64) -> RowKey {
        RowKey::new(value).unwrap()
    }

    #[test]
    fn mark_dirty_is_idempotent() {
        let mut tracker = DirtyTracker::new();
        assert!(tracker.mark_dirty(row(3)));
        assert!(!tracker.mark_dirty(row(3)));
        assert_eq!(tracker.count(), 1);
    }

    #[test]
    fn clear_removes_only_the_target_row() {
        let mut tracker = DirtyTracker::new();
        tracker.mark_dirty(row(1));
        tracker.mark_dirty(row(2));

        assert!(tracker.clear(row(1)));
        assert!(!tracker.clear(row(1)));
        assert!(!tracker.is_dirty(row(1)));
        assert!(tracker.is_dirty(row(2)));
    }

    #[test]
    fn clear_all_empties_the_set() {
        let mut tracker = DirtyTracker::new();
        tracker.mark_dirty(row(9));
        tracker.mark_dirty(row(4));
        assert_eq!(tracker.rows().collect::<Vec<_>>(), vec![row(4), row(9)]);

        tracker.clear_all();
        assert!(tracker.is_empty());
    }
}
