//! ``src/host/local.rs``
//!
//! Local filesystem as a host: paths given on the command line become
//! `HostEntry`s. Listing runs on the blocking pool through `walkdir`; file
//! content is read with `tokio::fs` only when the pipeline asks for it.

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::ingest::source::{DirectorySource, FileSource, HostEntry, RawFile};
use crate::model::media::extension_of;

#[derive(Debug, Clone)]
struct LocalFile {
    path: PathBuf,
}

#[async_trait]
impl FileSource for LocalFile {
    async fn read_bytes(&self) -> io::Result<Bytes> {
        trace!(path = %self.path.display(), "Reading local file");
        tokio::fs::read(&self.path).await.map(Bytes::from)
    }
}

/// A local directory, listed one level at a time.
#[derive(Debug, Clone)]
pub struct LocalDir {
    path: PathBuf,
    name: CompactString,
    show_hidden: bool,
}

impl LocalDir {
    pub fn new(path: impl Into<PathBuf>, show_hidden: bool) -> Self {
        let path = path.into();
        let name = file_name(&path);
        Self {
            path,
            name,
            show_hidden,
        }
    }
}

#[async_trait]
impl DirectorySource for LocalDir {
    fn name(&self) -> &str {
        &self.name
    }

    async fn entries(&self) -> io::Result<Vec<HostEntry>> {
        let dir = self.clone();
        tokio::task::spawn_blocking(move || dir.list())
            .await
            .map_err(io::Error::other)?
    }
}

impl LocalDir {
    fn list(&self) -> io::Result<Vec<HostEntry>> {
        let mut entries = Vec::new();
        let walker = WalkDir::new(&self.path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| {
                e.into_io_error()
                    .unwrap_or_else(|| io::Error::other("directory walk failed"))
            })?;
            let name = entry.file_name().to_string_lossy();
            if !self.show_hidden && name.starts_with('.') {
                continue;
            }

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                debug!(path = %entry.path().display(), "Skipping symlink");
            } else if file_type.is_dir() {
                entries.push(HostEntry::Directory(Box::new(Self::new(
                    entry.path(),
                    self.show_hidden,
                ))));
            } else if file_type.is_file() {
                let metadata = entry.metadata().map_err(io::Error::other)?;
                entries.push(HostEntry::File(raw_file(entry.path(), &metadata)));
            }
        }

        debug!(path = %self.path.display(), entries = entries.len(), "Listed directory");
        Ok(entries)
    }
}

fn file_name(path: &Path) -> CompactString {
    let name = path
        .file_name()
        .map_or_else(|| path.to_string_lossy(), |n| n.to_string_lossy());
    CompactString::from(&*name)
}

fn raw_file(path: &Path, metadata: &std::fs::Metadata) -> RawFile {
    let name = file_name(path);
    let mime = guess_mime(&name);
    let modified = metadata
        .modified()
        .map_or_else(|_| Utc::now(), DateTime::<Utc>::from);
    RawFile::new(
        name,
        mime,
        metadata.len(),
        modified,
        Arc::new(LocalFile {
            path: path.to_path_buf(),
        }),
    )
}

/// Declared MIME type for a local file, from its extension.
///
/// Unknown extensions get an empty type and are classified by extension
/// during validation.
#[must_use]
pub fn guess_mime(name: &str) -> &'static str {
    match extension_of(name).as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("json") => "application/json",
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("csv") => "text/csv",
        Some("md") => "text/markdown",
        Some("txt") => "text/plain",
        _ => "",
    }
}

/// Turn a local path into a host entry.
pub async fn entry_for(path: &Path, show_hidden: bool) -> io::Result<HostEntry> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.is_dir() {
        Ok(HostEntry::Directory(Box::new(LocalDir::new(path, show_hidden))))
    } else {
        Ok(HostEntry::File(raw_file(path, &metadata)))
    }
}
