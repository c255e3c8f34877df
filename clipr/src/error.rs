//! Clipboard error types

use compact_str::CompactString;
use thiserror::Error;

pub type ClipResult<T> = Result<T, ClipError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipError {
    #[error("Clipboard item not found: {0}")]
    ItemNotFound(CompactString),

    #[error("Nothing to copy: {label} is empty")]
    EmptyText { label: CompactString },

    #[error("Clipboard item too large: {size} bytes (max {max})")]
    ItemTooLarge { size: usize, max: usize },

    #[error("Clipboard configuration error: {0}")]
    ConfigError(CompactString),
}

impl ClipError {
    #[inline]
    pub fn empty_text(label: impl Into<CompactString>) -> Self {
        Self::EmptyText {
            label: label.into(),
        }
    }
}
