//! Grid store with toggle and atomic replacement.

use crate::model::grid::{Column, GridState, RowFlags, RowKey};

/// Authoritative in-memory grid.
#[derive(Debug, Clone, Default)]
pub struct GridStore {
    state: GridState,
}

impl GridStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store hydrated from a previously persisted grid.
    pub fn with_state(state: GridState) -> Self {
        Self { state }
    }

    /// Flips one cell, materializing the row first when absent.
    ///
    /// Returns the row flags after the flip.
    pub fn toggle(&mut self, row: RowKey, column: Column) -> RowFlags {
        let flags = self.state.flags_mut(row);
        flags.toggle(column);
        *flags
    }

    /// Swaps the whole grid in one step and returns the previous one.
    pub fn replace_all(&mut self, next: GridState) -> GridState {
        std::mem::replace(&mut self.state, next)
    }

    /// Point-in-time copy for persistence or export.
    pub fn snapshot(&self) -> GridState {
        self.state.clone()
    }

    pub fn flags(&self, row: RowKey) -> RowFlags {
        self.state.flags(row)
    }

    /// Read-only view of the current grid.
    pub fn state(&self) -> &GridState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::GridStore;
    use crate::model::grid::{Column, GridState, RowFlags, RowKey};

    fn row(value: i64) -> RowKey {
        RowKey::new(value).unwrap()
    }

    #[test]
    fn toggle_materializes_and_flips() {
        let mut store = GridStore::new();
        assert!(!store.state().contains(row(5)));

        let flags = store.toggle(row(5), Column::L);
        assert!(flags.l);
        assert!(store.state().contains(row(5)));

        let flags = store.toggle(row(5), Column::L);
        assert_eq!(flags, RowFlags::default());
        // Row stays materialized even when all flags are back to false.
        assert!(store.state().contains(row(5)));
    }

    #[test]
    fn snapshot_is_detached_from_later_mutation() {
        let mut store = GridStore::new();
        store.toggle(row(1), Column::A);
        let snapshot = store.snapshot();

        store.toggle(row(1), Column::A);
        store.toggle(row(2), Column::S);

        assert!(snapshot.flags(row(1)).a);
        assert!(!snapshot.contains(row(2)));
    }

    #[test]
    fn replace_all_swaps_everything() {
        let mut store = GridStore::new();
        store.toggle(row(1), Column::L);

        let mut next = GridState::new();
        next.flags_mut(row(2)).set(Column::A, true);
        let previous = store.replace_all(next);

        assert!(previous.flags(row(1)).l);
        assert!(!store.state().contains(row(1)));
        assert!(store.flags(row(2)).a);
    }
}
