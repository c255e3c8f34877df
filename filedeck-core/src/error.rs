//! src/error.rs
//! ============================================================================
//! # `DeckError`: Unified Error Type for the File Deck
//!
//! Every fallible operation in the core returns `DeckResult<T>`. Validation and
//! read failures are usually folded into a batch summary by the ingestion
//! pipeline; the remaining variants surface from direct single-record
//! operations and are reported through the notifier.

use std::{io, time::Duration};

use compact_str::CompactString;
use thiserror::Error;

use crate::model::{media::MediaType, record::RecordId};

/// Convenient alias carrying our unified error type
pub type DeckResult<T> = Result<T, DeckError>;

/// Why an input or a new name failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("file is empty")]
    EmptyFile,

    #[error("file is too large ({size} bytes, limit {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("unsupported file type '{mime}'")]
    UnsupportedType { mime: CompactString },

    #[error("invalid name '{name}': {reason}")]
    InvalidName {
        name: CompactString,
        reason: CompactString,
    },

    #[error("'{name}' has already been added")]
    Duplicate { name: CompactString },
}

/// What went wrong while materializing a file's content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadFailure {
    #[error("read timed out after {0:?}")]
    Timeout(Duration),

    #[error("read failed: {0}")]
    Io(CompactString),

    #[error("read aborted")]
    Aborted,
}

/// Unified error type for all file deck operations.
#[derive(Debug, Error)]
pub enum DeckError {
    /// Rejected filename, size, type or duplicate.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Content could not be read from the host.
    #[error("Could not read '{path}': {failure}")]
    Read {
        path: CompactString,
        failure: ReadFailure,
    },

    /// Operation referenced an unknown record.
    #[error("No file with id {0}")]
    NotFound(RecordId),

    /// Content edit (or text export) on a non-textual record.
    #[error("File {id} is {media} content and cannot be edited as text")]
    NotEditable { id: RecordId, media: MediaType },

    /// An ingestion batch is already in flight.
    #[error("Another batch of files is still being processed")]
    Busy,

    /// Tree projection found a file and a directory at the same path.
    #[error("Path conflict at '{path}'")]
    TreeConflict { path: CompactString },

    /// Standard IO error, auto-converted from `io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TOML config parsing error.
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// TOML config serialization error.
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// JSON (preference values) error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Clipboard collaborator refused the text.
    #[error("Clipboard error: {0}")]
    Clipboard(#[from] clipr::ClipError),

    /// Preference backend failure.
    #[error("Preferences error: {0}")]
    Preferences(String),
}

impl DeckError {
    pub fn read<P: Into<CompactString>>(path: P, failure: ReadFailure) -> Self {
        Self::Read {
            path: path.into(),
            failure,
        }
    }

    /// Errors that leave state untouched and only need to be reported.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NotFound(_)
                | Self::NotEditable { .. }
                | Self::Busy
                | Self::TreeConflict { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_distinguished_from_failures() {
        let duplicate = DeckError::from(ValidationError::Duplicate {
            name: "a.txt".into(),
        });
        assert!(duplicate.is_user_error());
        assert!(DeckError::NotFound(RecordId::new(3)).is_user_error());
        assert!(DeckError::Busy.is_user_error());

        let read = DeckError::read("a.txt", ReadFailure::Aborted);
        assert!(!read.is_user_error());
        assert!(!DeckError::Preferences("disk full".into()).is_user_error());
        assert_eq!(read.to_string(), "Could not read 'a.txt': read aborted");
    }
}
