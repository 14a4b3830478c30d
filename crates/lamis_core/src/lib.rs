//! Core state-tracking and synchronization engine for the LAMIS tracker.
//! This crate is the single source of truth for grid invariants.

pub mod codec;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;
pub mod transfer;

pub use codec::snapshot::{ExchangeEnvelope, ValidationError, APP_VERSION, DATA_TYPE};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::dirty::DirtyTracker;
pub use model::grid::{Column, GridState, InvalidArgument, RowFlags, RowKey, ROW_COUNT};
pub use repo::grid_repo::{GridRepository, RepoError, RepoResult, SqliteGridRepository, STORAGE_KEY};
pub use service::tracker_service::{
    ExportReceipt, ImportOutcome, PendingImport, TrackerError, TrackerService,
};
pub use store::grid_store::GridStore;
pub use transfer::{FileChannel, MemoryChannel, TransferChannel, TransferError};

/// Default database file name used by hosts that do not pick one.
pub const DEFAULT_DB_FILE_NAME: &str = "lamis_tracker.sqlite3";

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
