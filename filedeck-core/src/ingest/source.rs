//! ``src/ingest/source.rs``
//!
//! # Host inputs
//!
//! The deck never opens paths itself. Whatever hands it files (a browser
//! picker, a drag-drop event, the CLI walking a directory) implements these
//! traits, and the pipeline only ever talks to them.

use std::{fmt, io, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use compact_str::CompactString;

/// Lazily readable file content.
#[async_trait]
pub trait FileSource: Send + Sync + fmt::Debug {
    async fn read_bytes(&self) -> io::Result<Bytes>;
}

/// A directory handle whose entries are listed on demand.
#[async_trait]
pub trait DirectorySource: Send + Sync + fmt::Debug {
    /// Directory name as it should appear in relative paths.
    fn name(&self) -> &str;

    async fn entries(&self) -> io::Result<Vec<HostEntry>>;
}

/// One file offered by the host, before validation.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: CompactString,
    /// Path including directory segments; equals `name` for loose files.
    pub relative_path: CompactString,
    /// Declared MIME type, possibly empty.
    pub mime: CompactString,
    /// Declared byte length.
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub source: Arc<dyn FileSource>,
}

impl RawFile {
    pub fn new(
        name: impl Into<CompactString>,
        mime: impl Into<CompactString>,
        size: u64,
        last_modified: DateTime<Utc>,
        source: Arc<dyn FileSource>,
    ) -> Self {
        let name: CompactString = name.into();
        Self {
            relative_path: name.clone(),
            name,
            mime: mime.into(),
            size,
            last_modified,
            source,
        }
    }

    #[must_use]
    pub fn with_relative_path(mut self, path: impl Into<CompactString>) -> Self {
        self.relative_path = path.into();
        self
    }

    /// Path used in reports: the relative path, or the bare name.
    #[must_use]
    pub fn display_path(&self) -> &str {
        if self.relative_path.is_empty() {
            &self.name
        } else {
            &self.relative_path
        }
    }
}

/// What a picker or drop event delivers.
#[derive(Debug)]
pub enum HostEntry {
    File(RawFile),
    Directory(Box<dyn DirectorySource>),
}

impl HostEntry {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::File(file) => &file.name,
            Self::Directory(dir) => dir.name(),
        }
    }
}

impl From<RawFile> for HostEntry {
    fn from(file: RawFile) -> Self {
        Self::File(file)
    }
}
