//! Text transfer channels used for manual export/import.
//!
//! # Responsibility
//! - Abstract the medium (clipboard, file, test buffer) that carries an
//!   exchange envelope in or out of the app.
//!
//! # Invariants
//! - Channels move opaque UTF-8 text; they never interpret it.
//! - "Nothing to read" is `Ok(None)`, not an error.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// I/O failure of a transfer channel.
#[derive(Debug)]
pub enum TransferError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "transfer file `{}` failed: {source}", path.display())
            }
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// Capability to move text in or out of the app.
pub trait TransferChannel {
    /// Reads the current content. `Ok(None)` means the channel is empty.
    fn read_text(&mut self) -> Result<Option<String>, TransferError>;
    /// Replaces the channel content with `text`.
    fn write_text(&mut self, text: &str) -> Result<(), TransferError>;
}

/// In-process channel, the stand-in for a clipboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryChannel {
    content: Option<String>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
        }
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }
}

impl TransferChannel for MemoryChannel {
    fn read_text(&mut self) -> Result<Option<String>, TransferError> {
        Ok(self.content.clone())
    }

    fn write_text(&mut self, text: &str) -> Result<(), TransferError> {
        self.content = Some(text.to_string());
        Ok(())
    }
}

/// Channel backed by one file on disk.
///
/// A missing file reads as an empty channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChannel {
    path: PathBuf,
}

impl FileChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> TransferError {
        TransferError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TransferChannel for FileChannel {
    fn read_text(&mut self) -> Result<Option<String>, TransferError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn write_text(&mut self, text: &str) -> Result<(), TransferError> {
        std::fs::write(&self.path, text).map_err(|err| self.io_error(err))
    }
}
