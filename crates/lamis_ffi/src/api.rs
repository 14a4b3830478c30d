//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the tracker actions (toggle, save, save all, export, import)
//!   to Dart via FRB.
//! - Keep one tracker session per process; Dart owns the clipboard and the
//!   confirmation dialog, Rust owns grid state and validation.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures come back as `ok = false` plus a human-readable message.
//! - At most one import waits for confirmation at a time.
//! - The session is bound to one database file for the life of the process.

use chrono::Utc;
use lamis_core::db::open_db;
use lamis_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, Column,
    ImportOutcome, MemoryChannel, PendingImport, RowKey, SqliteGridRepository, TrackerError,
    TrackerService, DEFAULT_DB_FILE_NAME,
};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const DB_PATH_ENV: &str = "LAMIS_DB_PATH";

static TRACKER: Mutex<Option<TrackerSlot>> = Mutex::new(None);

struct TrackerSlot {
    db_path: PathBuf,
    service: TrackerService<SqliteGridRepository>,
    pending_import: Option<PendingImport>,
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Opens the tracker session on `db_path`.
///
/// Input semantics:
/// - `db_path`: SQLite file path; created and migrated when missing.
///
/// # FFI contract
/// - Safe to call repeatedly with the same path (idempotent).
/// - A different path than the open session is rejected.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn open_tracker(db_path: String) -> String {
    match open_tracker_at(db_path.trim()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Database file used by the tracker session.
///
/// Before `open_tracker`, `LAMIS_DB_PATH` overrides the default location in
/// the temp directory.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_db_path() -> String {
    let active = TRACKER
        .lock()
        .ok()
        .and_then(|guard| guard.as_ref().map(|slot| slot.db_path.clone()));
    active.unwrap_or_else(resolve_db_path).display().to_string()
}

/// Flags and save state of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    /// Row number, `1..=60`.
    pub row: u32,
    pub l: bool,
    pub a: bool,
    pub m: bool,
    pub i: bool,
    pub s: bool,
    /// Whether the per-row save control should be shown.
    pub dirty: bool,
}

/// Full grid view for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridView {
    pub ok: bool,
    /// All 60 rows in ascending order (absent rows as all-false).
    pub rows: Vec<RowView>,
    /// Drives the "save all" control (`> 0`).
    pub dirty_count: u32,
    pub message: String,
}

/// Response envelope for toggle/save actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridActionResponse {
    pub ok: bool,
    /// Updated row, when the action targeted one row.
    pub row: Option<RowView>,
    pub dirty_count: u32,
    pub message: String,
}

/// Export result; Dart writes `text` to the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResponse {
    pub ok: bool,
    pub text: Option<String>,
    pub filename: Option<String>,
    pub message: String,
}

/// Import step result (preview, confirm or cancel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResponse {
    pub ok: bool,
    /// Filename hint to show in the confirmation dialog.
    pub filename: Option<String>,
    /// `true` once the imported grid is durably saved.
    pub persisted: bool,
    pub message: String,
}

impl ImportResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            filename: None,
            persisted: false,
            message: message.into(),
        }
    }
}

/// Returns every row with flags and dirty state.
///
/// # FFI contract
/// - Sync call, opens the tracker database on first use.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn grid_view() -> GridView {
    match with_tracker(|slot| {
        let service = &slot.service;
        let rows = RowKey::all().map(|row| row_view(service, row)).collect::<Vec<_>>();
        (rows, dirty_count(service))
    }) {
        Ok((rows, dirty_count)) => GridView {
            ok: true,
            rows,
            dirty_count,
            message: String::new(),
        },
        Err(err) => GridView {
            ok: false,
            rows: Vec::new(),
            dirty_count: 0,
            message: format!("grid_view failed: {err}"),
        },
    }
}

/// Flips one checkbox and marks its row dirty.
///
/// # FFI contract
/// - `column` is one of `L|A|M|I|S` (case-insensitive).
/// - Out-of-range rows or unknown columns return `ok = false`.
#[flutter_rust_bridge::frb(sync)]
pub fn grid_toggle(row: i64, column: String) -> GridActionResponse {
    let result = with_tracker(|slot| {
        let row = RowKey::new(row)?;
        let column = column.parse::<Column>()?;
        slot.service.toggle(row, column);
        Ok::<_, TrackerError>(row)
    });
    row_action_response("grid_toggle", "Toggled.", result)
}

/// Saves the full grid and clears dirtiness of `row` only.
#[flutter_rust_bridge::frb(sync)]
pub fn grid_save_row(row: i64) -> GridActionResponse {
    let result = with_tracker(|slot| {
        let row = RowKey::new(row)?;
        slot.service.save_row(row)?;
        Ok::<_, TrackerError>(row)
    });
    row_action_response("grid_save_row", "Row saved.", result)
}

/// Saves the full grid and clears every dirty row.
#[flutter_rust_bridge::frb(sync)]
pub fn grid_save_all() -> GridActionResponse {
    let result = with_tracker(|slot| {
        slot.service.save_all()?;
        Ok::<_, TrackerError>(dirty_count(&slot.service))
    });
    match flatten(result) {
        Ok(dirty_count) => GridActionResponse {
            ok: true,
            row: None,
            dirty_count,
            message: "All rows saved.".to_string(),
        },
        Err(err) => GridActionResponse {
            ok: false,
            row: None,
            dirty_count: current_dirty_count(),
            message: format!("grid_save_all failed: {err}"),
        },
    }
}

/// Saves pending changes when the app goes to background.
///
/// Failures are logged only; returns whether everything is saved.
#[flutter_rust_bridge::frb(sync)]
pub fn grid_autosave() -> bool {
    with_tracker(|slot| slot.service.save_all_best_effort()).unwrap_or_else(|err| {
        warn!("event=grid_autosave module=ffi status=error error={err}");
        false
    })
}

/// Encodes the grid as an exchange envelope for the clipboard.
///
/// # FFI contract
/// - Non-destructive; grid and dirty rows are unchanged.
#[flutter_rust_bridge::frb(sync)]
pub fn export_envelope() -> ExportResponse {
    let result = with_tracker(|slot| {
        let mut channel = MemoryChannel::new();
        let receipt = slot.service.export(&mut channel, Utc::now())?;
        Ok::<_, TrackerError>((receipt, channel.content().map(str::to_string)))
    });
    match flatten(result) {
        Ok((receipt, text)) => ExportResponse {
            ok: true,
            text,
            message: format!("Exported {} row(s).", receipt.exported_rows),
            filename: Some(receipt.filename),
        },
        Err(err) => ExportResponse {
            ok: false,
            text: None,
            filename: None,
            message: format!("export failed: {err}"),
        },
    }
}

/// Validates pasted text and holds it until confirmed or cancelled.
///
/// # FFI contract
/// - Never changes the grid.
/// - Replaces any import already waiting for confirmation.
#[flutter_rust_bridge::frb(sync)]
pub fn import_begin(text: String) -> ImportResponse {
    let result = with_tracker(|slot| {
        let pending = slot.service.preview_import(&text)?;
        let filename = pending.filename().to_string();
        let rows = pending.row_count();
        slot.pending_import = Some(pending);
        Ok::<_, TrackerError>((filename, rows))
    });
    match flatten(result) {
        Ok((filename, rows)) => ImportResponse {
            ok: true,
            message: format!("Replace all data with `{filename}` ({rows} row(s))?"),
            filename: Some(filename),
            persisted: false,
        },
        Err(err) => ImportResponse::failure(format!("import rejected: {err}")),
    }
}

/// Applies the import waiting for confirmation.
///
/// `ok = true` means the grid was replaced; `persisted` tells whether the
/// durable save also succeeded.
#[flutter_rust_bridge::frb(sync)]
pub fn import_confirm() -> ImportResponse {
    let result = with_tracker(|slot| {
        slot.pending_import.take().map(|pending| {
            let filename = pending.filename().to_string();
            (filename, slot.service.apply_import(pending))
        })
    });
    match result {
        Ok(Some((filename, ImportOutcome::Applied { rows }))) => ImportResponse {
            ok: true,
            filename: Some(filename),
            persisted: true,
            message: format!("Imported {rows} row(s)."),
        },
        Ok(Some((filename, ImportOutcome::AppliedNotPersisted { rows, error }))) => {
            ImportResponse {
                ok: true,
                filename: Some(filename),
                persisted: false,
                message: format!("Imported {rows} row(s), but saving failed: {error}"),
            }
        }
        Ok(None) => ImportResponse::failure("no import is waiting for confirmation"),
        Err(err) => ImportResponse::failure(format!("import_confirm failed: {err}")),
    }
}

/// Drops the import waiting for confirmation, if any.
#[flutter_rust_bridge::frb(sync)]
pub fn import_cancel() -> ImportResponse {
    match with_tracker(|slot| slot.pending_import.take()) {
        Ok(Some(pending)) => {
            let filename = pending.filename().to_string();
            pending.cancel();
            ImportResponse {
                ok: true,
                filename: Some(filename),
                persisted: false,
                message: "Import cancelled.".to_string(),
            }
        }
        Ok(None) => ImportResponse::failure("no import is waiting for confirmation"),
        Err(err) => ImportResponse::failure(format!("import_cancel failed: {err}")),
    }
}

fn resolve_db_path() -> PathBuf {
    if let Ok(raw) = std::env::var(DB_PATH_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)
}

fn open_tracker_at(db_path: &str) -> Result<(), String> {
    if db_path.is_empty() {
        return Err("db_path cannot be empty".to_string());
    }
    let requested = PathBuf::from(db_path);
    let mut guard = TRACKER
        .lock()
        .map_err(|_| "tracker state lock poisoned".to_string())?;

    match guard.as_ref() {
        Some(slot) if slot.db_path == requested => Ok(()),
        Some(slot) => Err(format!(
            "tracker already open at `{}`; refusing to switch to `{}`",
            slot.db_path.display(),
            requested.display()
        )),
        None => {
            *guard = Some(open_slot(&requested)?);
            Ok(())
        }
    }
}

fn open_slot(db_path: &Path) -> Result<TrackerSlot, String> {
    let conn = open_db(db_path).map_err(|err| format!("tracker DB open failed: {err}"))?;
    let service = TrackerService::open(SqliteGridRepository::new(conn))
        .map_err(|err| format!("tracker load failed: {err}"))?;
    info!(
        "event=tracker_open module=ffi status=ok rows={}",
        service.state().len()
    );
    Ok(TrackerSlot {
        db_path: db_path.to_path_buf(),
        service,
        pending_import: None,
    })
}

fn with_tracker<T>(f: impl FnOnce(&mut TrackerSlot) -> T) -> Result<T, String> {
    let mut guard = TRACKER
        .lock()
        .map_err(|_| "tracker state lock poisoned".to_string())?;

    if guard.is_none() {
        *guard = Some(open_slot(&resolve_db_path())?);
    }

    match guard.as_mut() {
        Some(slot) => Ok(f(slot)),
        None => Err("tracker session unavailable".to_string()),
    }
}

fn flatten<T>(result: Result<Result<T, TrackerError>, String>) -> Result<T, String> {
    result.and_then(|inner| inner.map_err(|err| err.to_string()))
}

fn row_action_response(
    action: &str,
    success: &str,
    result: Result<Result<RowKey, TrackerError>, String>,
) -> GridActionResponse {
    let outcome = flatten(result).and_then(|row| {
        with_tracker(|slot| (row_view(&slot.service, row), dirty_count(&slot.service)))
    });
    match outcome {
        Ok((view, dirty_count)) => GridActionResponse {
            ok: true,
            row: Some(view),
            dirty_count,
            message: success.to_string(),
        },
        Err(err) => GridActionResponse {
            ok: false,
            row: None,
            dirty_count: current_dirty_count(),
            message: format!("{action} failed: {err}"),
        },
    }
}

fn current_dirty_count() -> u32 {
    with_tracker(|slot| dirty_count(&slot.service)).unwrap_or(0)
}

fn dirty_count(service: &TrackerService<SqliteGridRepository>) -> u32 {
    u32::try_from(service.dirty_count()).unwrap_or(u32::MAX)
}

fn row_view(service: &TrackerService<SqliteGridRepository>, row: RowKey) -> RowView {
    let flags = service.flags(row);
    RowView {
        row: row.get(),
        l: flags.l,
        a: flags.a,
        m: flags.m,
        i: flags.i,
        s: flags.s,
        dirty: service.is_dirty(row),
    }
}
