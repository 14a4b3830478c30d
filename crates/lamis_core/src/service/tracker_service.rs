//! Tracker session service.
//!
//! # Responsibility
//! - Own the in-memory grid and its dirty set for one session.
//! - Persist full snapshots on per-row and bulk saves.
//! - Run the export and the two-step (preview, then apply) import protocol.
//!
//! # Invariants
//! - A row leaves the dirty set only after a save of the full grid succeeded.
//! - A failed import step before `apply_import` never changes the grid.
//! - `apply_import` replaces the grid even when the follow-up save fails.
//!
//! # Import protocol
//! `preview_import`/`begin_import` (Idle -> AwaitingConfirmation) yield a
//! [`PendingImport`]. Passing it to `apply_import` performs the destructive
//! step; dropping it or calling [`PendingImport::cancel`] returns to Idle.

use crate::codec::snapshot::{ExchangeEnvelope, ValidationError};
use crate::model::dirty::DirtyTracker;
use crate::model::grid::{Column, GridState, InvalidArgument, RowFlags, RowKey};
use crate::repo::grid_repo::{GridRepository, RepoError};
use crate::store::grid_store::GridStore;
use crate::transfer::{TransferChannel, TransferError};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Filename shown when an imported payload carries none.
const UNKNOWN_FILENAME: &str = "unknown";

/// Error surfaced to the initiator of a tracker action.
#[derive(Debug)]
pub enum TrackerError {
    InvalidArgument(InvalidArgument),
    /// Durable load/save failed; the in-memory grid is still authoritative.
    PersistenceFailure(RepoError),
    /// The transfer channel held nothing to import.
    TransferChannelEmpty,
    Transfer(TransferError),
    Validation(ValidationError),
    Encode(serde_json::Error),
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(err) => write!(f, "{err}"),
            Self::PersistenceFailure(err) => write!(f, "saving tracker data failed: {err}"),
            Self::TransferChannelEmpty => write!(f, "nothing available to import"),
            Self::Transfer(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "import rejected: {err}"),
            Self::Encode(err) => write!(f, "export encoding failed: {err}"),
        }
    }
}

impl Error for TrackerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidArgument(err) => Some(err),
            Self::PersistenceFailure(err) => Some(err),
            Self::TransferChannelEmpty => None,
            Self::Transfer(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<InvalidArgument> for TrackerError {
    fn from(value: InvalidArgument) -> Self {
        Self::InvalidArgument(value)
    }
}

impl From<RepoError> for TrackerError {
    fn from(value: RepoError) -> Self {
        Self::PersistenceFailure(value)
    }
}

impl From<TransferError> for TrackerError {
    fn from(value: TransferError) -> Self {
        Self::Transfer(value)
    }
}

impl From<ValidationError> for TrackerError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Result of a completed export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    /// Informational filename stamped into the envelope.
    pub filename: String,
    /// Materialized rows included in the payload.
    pub exported_rows: usize,
}

/// Validated import waiting for user confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImport {
    envelope: ExchangeEnvelope,
}

impl PendingImport {
    /// Filename hint to show in the confirmation prompt.
    pub fn filename(&self) -> &str {
        self.envelope.filename().unwrap_or(UNKNOWN_FILENAME)
    }

    /// Rows the import would write, for the confirmation prompt.
    pub fn row_count(&self) -> usize {
        self.envelope.data().len()
    }

    /// Abandons the import. The grid is left untouched.
    pub fn cancel(self) {
        info!(
            "event=grid_import module=service status=cancelled filename={}",
            self.filename()
        );
    }
}

/// Outcome of an applied import.
#[derive(Debug)]
pub enum ImportOutcome {
    /// Grid replaced and saved.
    Applied { rows: usize },
    /// Grid replaced in memory, but the durable save failed.
    AppliedNotPersisted { rows: usize, error: RepoError },
}

impl ImportOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    pub fn rows(&self) -> usize {
        match self {
            Self::Applied { rows } | Self::AppliedNotPersisted { rows, .. } => *rows,
        }
    }
}

/// One tracker session over a persistence gateway.
pub struct TrackerService<R: GridRepository> {
    repo: R,
    store: GridStore,
    dirty: DirtyTracker,
}

impl<R: GridRepository> TrackerService<R> {
    /// Opens a session, hydrating the grid from `repo`.
    ///
    /// A repository without a saved record yields an empty grid.
    pub fn open(repo: R) -> Result<Self, TrackerError> {
        let state = match repo.load_grid() {
            Ok(Some(state)) => {
                info!(
                    "event=grid_load module=service status=ok rows={}",
                    state.len()
                );
                state
            }
            Ok(None) => {
                info!("event=grid_load module=service status=empty");
                GridState::new()
            }
            Err(err) => {
                warn!("event=grid_load module=service status=error error={err}");
                return Err(err.into());
            }
        };

        Ok(Self {
            repo,
            store: GridStore::with_state(state),
            dirty: DirtyTracker::new(),
        })
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Current grid (read-only).
    pub fn state(&self) -> &GridState {
        self.store.state()
    }

    pub fn flags(&self, row: RowKey) -> RowFlags {
        self.store.flags(row)
    }

    /// Dirty set (read-only), drives the save affordances.
    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    pub fn is_dirty(&self, row: RowKey) -> bool {
        self.dirty.is_dirty(row)
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.count()
    }

    /// Flips one cell and marks its row dirty.
    pub fn toggle(&mut self, row: RowKey, column: Column) -> RowFlags {
        let flags = self.store.toggle(row, column);
        self.dirty.mark_dirty(row);
        debug!(
            "event=grid_toggle module=service status=ok row={row} column={column} value={} dirty_rows={}",
            flags.get(column),
            self.dirty.count()
        );
        flags
    }

    /// Persists the whole grid, then marks only `row` as saved.
    pub fn save_row(&mut self, row: RowKey) -> Result<(), TrackerError> {
        self.persist_snapshot("row")?;
        self.dirty.clear(row);
        Ok(())
    }

    /// Persists the whole grid and clears every dirty row.
    pub fn save_all(&mut self) -> Result<(), TrackerError> {
        self.persist_snapshot("all")?;
        self.dirty.clear_all();
        Ok(())
    }

    /// Background save: never surfaces errors, only logs them.
    ///
    /// Returns `true` when nothing was pending or the save succeeded.
    pub fn save_all_best_effort(&mut self) -> bool {
        if self.dirty.is_empty() {
            return true;
        }
        match self.save_all() {
            Ok(()) => true,
            Err(err) => {
                warn!("event=grid_autosave module=service status=error error={err}");
                false
            }
        }
    }

    /// Encodes the current grid and writes it to `channel`.
    pub fn export(
        &self,
        channel: &mut dyn TransferChannel,
        now: DateTime<Utc>,
    ) -> Result<ExportReceipt, TrackerError> {
        let envelope = ExchangeEnvelope::encode(&self.store.snapshot(), now);
        let text = envelope.to_pretty_json().map_err(TrackerError::Encode)?;

        if let Err(err) = channel.write_text(&text) {
            warn!("event=grid_export module=service status=error error={err}");
            return Err(err.into());
        }

        let receipt = ExportReceipt {
            filename: envelope.filename().unwrap_or(UNKNOWN_FILENAME).to_string(),
            exported_rows: envelope.data().len(),
        };
        info!(
            "event=grid_export module=service status=ok rows={} filename={}",
            receipt.exported_rows, receipt.filename
        );
        Ok(receipt)
    }

    /// Reads `channel` and validates its content for import.
    pub fn begin_import(
        &self,
        channel: &mut dyn TransferChannel,
    ) -> Result<PendingImport, TrackerError> {
        let text = channel.read_text().map_err(|err| {
            warn!("event=grid_import module=service status=error stage=read error={err}");
            TrackerError::from(err)
        })?;
        match text {
            Some(text) => self.preview_import(&text),
            None => Err(empty_channel()),
        }
    }

    /// Validates already-read text for import.
    pub fn preview_import(&self, raw: &str) -> Result<PendingImport, TrackerError> {
        if raw.trim().is_empty() {
            return Err(empty_channel());
        }

        match ExchangeEnvelope::decode(raw) {
            Ok(envelope) => {
                let pending = PendingImport { envelope };
                info!(
                    "event=grid_import module=service status=awaiting_confirmation rows={} filename={}",
                    pending.envelope.data().len(),
                    pending.filename()
                );
                Ok(pending)
            }
            Err(err) => {
                warn!("event=grid_import module=service status=rejected reason={err}");
                Err(err.into())
            }
        }
    }

    /// Applies a confirmed import: replace, clear dirty rows, save.
    pub fn apply_import(&mut self, pending: PendingImport) -> ImportOutcome {
        let next = pending.envelope.into_data();
        let rows = next.len();
        self.store.replace_all(next);
        self.dirty.clear_all();

        match self.repo.save_grid(self.store.state()) {
            Ok(()) => {
                info!("event=grid_import module=service status=ok rows={rows}");
                ImportOutcome::Applied { rows }
            }
            Err(error) => {
                warn!(
                    "event=grid_import module=service status=applied_not_persisted rows={rows} error={error}"
                );
                ImportOutcome::AppliedNotPersisted { rows, error }
            }
        }
    }

    fn persist_snapshot(&self, scope: &str) -> Result<(), TrackerError> {
        let snapshot = self.store.snapshot();
        match self.repo.save_grid(&snapshot) {
            Ok(()) => {
                info!(
                    "event=grid_save module=service status=ok scope={scope} rows={}",
                    snapshot.len()
                );
                Ok(())
            }
            Err(err) => {
                warn!("event=grid_save module=service status=error scope={scope} error={err}");
                Err(err.into())
            }
        }
    }
}

fn empty_channel() -> TrackerError {
    info!("event=grid_import module=service status=empty");
    TrackerError::TransferChannelEmpty
}
