//! Portable exchange format for manual export/import.
//!
//! # Responsibility
//! - Wrap a grid snapshot with export metadata.
//! - Validate pasted text before anything touches the live grid.
//!
//! # Invariants
//! - Encoding is deterministic for a given grid and timestamp.
//! - Decoding is side-effect free.

pub mod snapshot;
