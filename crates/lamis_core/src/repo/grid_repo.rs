//! Grid repository contract and SQLite-backed implementation.
//!
//! # Responsibility
//! - Load the persisted grid (or report that none exists yet).
//! - Save the complete grid under the fixed storage key.
//!
//! # Invariants
//! - `save_grid` is idempotent: saving the same grid twice leaves one record.
//! - Read paths reject a stored record that is not a JSON mapping instead of
//!   masking it; row entries inside the mapping are read leniently.

use crate::db::DbError;
use crate::model::grid::{json_kind, GridState};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fixed logical key of the persisted grid record.
pub const STORAGE_KEY: &str = "lamis_data";

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence failure for grid load/save.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Serialization(serde_json::Error),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "grid record encoding failed: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted grid data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Durable storage for the grid snapshot.
pub trait GridRepository {
    /// Returns `None` when nothing has been saved yet.
    fn load_grid(&self) -> RepoResult<Option<GridState>>;
    /// Overwrites the stored record with `state`.
    fn save_grid(&self, state: &GridState) -> RepoResult<()>;
}

impl<R: GridRepository + ?Sized> GridRepository for &R {
    fn load_grid(&self) -> RepoResult<Option<GridState>> {
        (**self).load_grid()
    }

    fn save_grid(&self, state: &GridState) -> RepoResult<()> {
        (**self).save_grid(state)
    }
}

/// SQLite-backed grid repository.
///
/// Owns its connection so a tracker session can keep it for its lifetime.
pub struct SqliteGridRepository {
    conn: Connection,
}

impl SqliteGridRepository {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl GridRepository for SqliteGridRepository {
    fn load_grid(&self) -> RepoResult<Option<GridState>> {
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                [STORAGE_KEY],
                |row| row.get(0),
            )
            .optional()?;

        let Some(text) = stored else {
            return Ok(None);
        };

        match serde_json::from_str::<Value>(&text)? {
            Value::Object(object) => Ok(Some(GridState::from_json_object(&object))),
            other => Err(RepoError::InvalidData(format!(
                "expected a mapping under `{STORAGE_KEY}`, found {}",
                json_kind(&other)
            ))),
        }
    }

    fn save_grid(&self, state: &GridState) -> RepoResult<()> {
        let encoded = serde_json::to_string(state)?;
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![STORAGE_KEY, encoded],
        )?;
        Ok(())
    }
}
