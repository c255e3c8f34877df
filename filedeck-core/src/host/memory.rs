//! ``src/host/memory.rs``
//!
//! In-memory host entries. Used by embedders that already hold file bytes
//! (e.g. a web front end handing over picker results) and by the tests.

use std::{io, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use compact_str::CompactString;

use crate::ingest::source::{DirectorySource, FileSource, HostEntry, RawFile};

#[derive(Debug, Clone)]
struct MemoryContent {
    bytes: Bytes,
    delay: Option<Duration>,
    fail: bool,
}

#[async_trait]
impl FileSource for MemoryContent {
    async fn read_bytes(&self) -> io::Result<Bytes> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(io::Error::other("simulated read failure"));
        }
        Ok(self.bytes.clone())
    }
}

/// Builder for an in-memory file.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: CompactString,
    mime: CompactString,
    declared_size: Option<u64>,
    last_modified: DateTime<Utc>,
    content: MemoryContent,
}

impl MemoryFile {
    pub fn new(name: &str, mime: &str, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            declared_size: None,
            last_modified: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default(),
            content: MemoryContent {
                bytes: bytes.into(),
                delay: None,
                fail: false,
            },
        }
    }

    /// A file with no declared type, classified by its extension.
    pub fn text(name: &str, text: &str) -> Self {
        Self::new(name, "", Bytes::copy_from_slice(text.as_bytes()))
    }

    #[must_use]
    pub fn modified_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = at;
        self
    }

    /// Report a size different from the real content length.
    #[must_use]
    pub fn declared_size(mut self, size: u64) -> Self {
        self.declared_size = Some(size);
        self
    }

    /// Make every read take at least `delay`.
    #[must_use]
    pub fn slow(mut self, delay: Duration) -> Self {
        self.content.delay = Some(delay);
        self
    }

    /// Make every read fail with an I/O error.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.content.fail = true;
        self
    }

    pub fn into_raw(self) -> RawFile {
        let size = self
            .declared_size
            .unwrap_or(self.content.bytes.len() as u64);
        RawFile::new(
            self.name,
            self.mime,
            size,
            self.last_modified,
            Arc::new(self.content),
        )
    }

    pub fn into_entry(self) -> HostEntry {
        HostEntry::File(self.into_raw())
    }
}

/// Builder for an in-memory directory.
#[derive(Debug)]
pub struct MemoryDir {
    name: CompactString,
    children: parking_lot::Mutex<Vec<HostEntry>>,
    fail: bool,
}

impl MemoryDir {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            children: parking_lot::Mutex::new(Vec::new()),
            fail: false,
        }
    }

    #[must_use]
    pub fn with_file(self, file: MemoryFile) -> Self {
        self.children.lock().push(file.into_entry());
        self
    }

    #[must_use]
    pub fn with_dir(self, dir: MemoryDir) -> Self {
        self.children.lock().push(dir.into_entry());
        self
    }

    /// Make listing this directory fail.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn into_entry(self) -> HostEntry {
        HostEntry::Directory(Box::new(self))
    }
}

#[async_trait]
impl DirectorySource for MemoryDir {
    fn name(&self) -> &str {
        &self.name
    }

    /// Hands the children over; a directory is listed once per batch.
    async fn entries(&self) -> io::Result<Vec<HostEntry>> {
        if self.fail {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "simulated listing failure",
            ));
        }
        Ok(std::mem::take(&mut *self.children.lock()))
    }
}
