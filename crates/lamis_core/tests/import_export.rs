use chrono::{DateTime, TimeZone, Utc};
use lamis_core::db::open_db_in_memory;
use lamis_core::{
    Column, ExchangeEnvelope, FileChannel, GridRepository, GridState, ImportOutcome,
    MemoryChannel, RepoError, RepoResult, RowFlags, RowKey, SqliteGridRepository, TrackerError,
    TrackerService, TransferChannel, TransferError, ValidationError,
};
use std::cell::Cell;
use std::io;
use std::path::PathBuf;

fn row(value: i64) -> RowKey {
    RowKey::new(value).unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap()
}

fn memory_service() -> TrackerService<SqliteGridRepository> {
    TrackerService::open(SqliteGridRepository::new(open_db_in_memory().unwrap())).unwrap()
}

fn envelope_text(grid: &GridState) -> String {
    ExchangeEnvelope::encode(grid, now()).to_pretty_json().unwrap()
}

/// Grid with only row 2 column A set.
fn row_two_grid() -> GridState {
    let mut grid = GridState::new();
    grid.flags_mut(row(2)).set(Column::A, true);
    grid
}

struct SwitchableRepository {
    fail_saves: Cell<bool>,
}

impl GridRepository for SwitchableRepository {
    fn load_grid(&self) -> RepoResult<Option<GridState>> {
        Ok(None)
    }

    fn save_grid(&self, _state: &GridState) -> RepoResult<()> {
        if self.fail_saves.get() {
            Err(RepoError::InvalidData("disk full".to_string()))
        } else {
            Ok(())
        }
    }
}

struct BrokenChannel;

impl BrokenChannel {
    fn failure() -> TransferError {
        TransferError::Io {
            path: PathBuf::from("clipboard"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "clipboard locked"),
        }
    }
}

impl TransferChannel for BrokenChannel {
    fn read_text(&mut self) -> Result<Option<String>, TransferError> {
        Err(Self::failure())
    }

    fn write_text(&mut self, _text: &str) -> Result<(), TransferError> {
        Err(Self::failure())
    }
}

#[test]
fn export_writes_envelope_and_leaves_state_alone() {
    let mut service = memory_service();
    service.toggle(row(1), Column::L);
    service.toggle(row(33), Column::I);
    let mut channel = MemoryChannel::new();

    let receipt = service.export(&mut channel, now()).unwrap();

    assert_eq!(receipt.filename, "LAMIS_Data_2024-03-05_14-30-00.json");
    assert_eq!(receipt.exported_rows, 2);
    let written = ExchangeEnvelope::decode(channel.content().unwrap()).unwrap();
    assert_eq!(written.data(), service.state());
    assert_eq!(service.dirty_count(), 2);
}

#[test]
fn export_failure_is_reported() {
    let service = memory_service();
    let err = service.export(&mut BrokenChannel, now()).unwrap_err();
    assert!(matches!(err, TrackerError::Transfer(_)));
}

#[test]
fn import_from_empty_channel_is_reported() {
    let service = memory_service();

    let err = service.begin_import(&mut MemoryChannel::new()).unwrap_err();
    assert!(matches!(err, TrackerError::TransferChannelEmpty));

    let err = service
        .begin_import(&mut MemoryChannel::with_text("  \n"))
        .unwrap_err();
    assert!(matches!(err, TrackerError::TransferChannelEmpty));
}

#[test]
fn channel_read_failure_is_reported() {
    let service = memory_service();
    let err = service.begin_import(&mut BrokenChannel).unwrap_err();
    assert!(matches!(err, TrackerError::Transfer(_)));
}

#[test]
fn rejected_payloads_leave_state_unchanged() {
    let mut service = memory_service();
    service.toggle(row(1), Column::L);
    let before = service.state().clone();

    let cases = [
        "not json",
        r#"{"foo":1}"#,
        r#"{"dataType":"OTHER","data":{}}"#,
    ];
    for raw in cases {
        let err = service
            .begin_import(&mut MemoryChannel::with_text(raw))
            .unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)), "input: {raw}");
    }

    let err = service.preview_import(r#"{"data":"nope"}"#).unwrap_err();
    assert!(matches!(
        err,
        TrackerError::Validation(ValidationError::MissingDataField)
    ));

    assert_eq!(service.state(), &before);
    assert!(service.is_dirty(row(1)));
}

#[test]
fn confirmed_import_replaces_wholesale_and_clears_dirty_rows() {
    let mut service = memory_service();
    service.toggle(row(1), Column::L);
    service.save_all().unwrap();
    service.toggle(row(7), Column::M);

    let pending = service
        .begin_import(&mut MemoryChannel::with_text(envelope_text(&row_two_grid())))
        .unwrap();
    assert_eq!(pending.filename(), "LAMIS_Data_2024-03-05_14-30-00.json");
    assert_eq!(pending.row_count(), 1);

    let outcome = service.apply_import(pending);
    assert!(outcome.is_persisted());
    assert_eq!(outcome.rows(), 1);

    assert_eq!(service.state(), &row_two_grid());
    assert_eq!(service.flags(row(1)), RowFlags::default());
    assert!(service.flags(row(2)).a);
    assert_eq!(service.dirty_count(), 0);

    let stored = service.repository().load_grid().unwrap().unwrap();
    assert_eq!(stored, row_two_grid());
}

#[test]
fn cancelled_import_changes_nothing() {
    let mut service = memory_service();
    service.toggle(row(1), Column::L);
    let before = service.state().clone();

    let pending = service
        .preview_import(&envelope_text(&row_two_grid()))
        .unwrap();
    pending.cancel();

    assert_eq!(service.state(), &before);
    assert!(service.is_dirty(row(1)));
    assert_eq!(service.repository().load_grid().unwrap(), None);
}

#[test]
fn toggle_before_apply_is_discarded_and_after_apply_is_kept() {
    let mut service = memory_service();
    let pending = service
        .preview_import(&envelope_text(&row_two_grid()))
        .unwrap();

    service.toggle(row(10), Column::S);
    service.apply_import(pending);
    assert!(!service.state().contains(row(10)));
    assert!(!service.is_dirty(row(10)));

    service.toggle(row(2), Column::L);
    let flags = service.flags(row(2));
    assert!(flags.l && flags.a);
    assert!(service.is_dirty(row(2)));
}

#[test]
fn import_applies_in_memory_even_when_save_fails() {
    let repo = SwitchableRepository {
        fail_saves: Cell::new(false),
    };
    let mut service = TrackerService::open(&repo).unwrap();
    service.toggle(row(1), Column::L);

    let pending = service
        .preview_import(&envelope_text(&row_two_grid()))
        .unwrap();
    repo.fail_saves.set(true);
    let outcome = service.apply_import(pending);

    match outcome {
        ImportOutcome::AppliedNotPersisted { rows, error } => {
            assert_eq!(rows, 1);
            assert!(error.to_string().contains("disk full"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(service.state(), &row_two_grid());
    assert_eq!(service.dirty_count(), 0);
}

#[test]
fn untagged_import_without_filename_uses_placeholder() {
    let service = memory_service();
    let pending = service.preview_import(r#"{"data":{}}"#).unwrap();
    assert_eq!(pending.filename(), "unknown");
    assert_eq!(pending.row_count(), 0);
}

#[test]
fn export_from_one_device_imports_into_another_via_file() {
    let dir = tempfile::tempdir().unwrap();
    let transfer_path = dir.path().join("LAMIS_Data.json");

    let mut source = memory_service();
    source.toggle(row(1), Column::L);
    source.toggle(row(59), Column::A);
    source.toggle(row(59), Column::S);
    source
        .export(&mut FileChannel::new(&transfer_path), now())
        .unwrap();

    let mut target = memory_service();
    target.toggle(row(20), Column::M);
    let pending = target
        .begin_import(&mut FileChannel::new(&transfer_path))
        .unwrap();
    assert!(target.apply_import(pending).is_persisted());

    assert_eq!(target.state(), source.state());
    assert_eq!(target.dirty_count(), 0);
}

#[test]
fn import_from_missing_file_is_empty_channel() {
    let dir = tempfile::tempdir().unwrap();
    let service = memory_service();
    let err = service
        .begin_import(&mut FileChannel::new(dir.path().join("absent.json")))
        .unwrap_err();
    assert!(matches!(err, TrackerError::TransferChannelEmpty));
}
