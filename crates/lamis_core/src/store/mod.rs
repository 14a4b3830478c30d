//! In-memory grid ownership.
//!
//! # Responsibility
//! - Hold the authoritative in-memory grid for one tracker session.
//! - Apply pure mutations (toggle, wholesale replacement).
//!
//! # Invariants
//! - Store mutations never touch persistence or dirty bookkeeping.
//! - Snapshots are owned copies, detached from later mutations.

pub mod grid_store;
