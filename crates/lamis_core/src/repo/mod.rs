//! Persistence gateway contracts and SQLite implementation.
//!
//! # Responsibility
//! - Define the load/save contract for the grid snapshot.
//! - Isolate SQLite and JSON encoding details from the tracker service.
//!
//! # Invariants
//! - Exactly one logical record, keyed by `STORAGE_KEY`, overwritten in place.
//! - Saves always write the full grid, never a per-row delta.

pub mod grid_repo;
