//! Grid domain model for the LAMIS checkbox tracker.
//!
//! # Responsibility
//! - Define the fixed row/column universe and the flags stored per row.
//! - Track which rows carry unsaved in-memory changes.
//!
//! # Invariants
//! - Every `RowKey` lies in `1..=ROW_COUNT`.
//! - An absent row is semantically identical to an all-false row.
//! - A materialized `RowFlags` always carries all five columns.

pub mod dirty;
pub mod grid;
