//! `src/model/record.rs`
//! ============================================================
//! The in-memory representation of one ingested file.

use std::fmt;
use std::time::Duration;

use bytesize::ByteSize;
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::model::media::{Content, MediaType};

/// Opaque record identity, minted by the store and never reused in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(u64);

impl RecordId {
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Path segments; most drops are only a few levels deep.
pub type Segments<'a> = SmallVec<[&'a str; 8]>;

/// Split a `/`-separated path into its non-empty segments.
#[must_use]
pub fn split_segments(path: &str) -> Segments<'_> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Everything the store needs to create a record; the id is assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDraft {
    pub name: CompactString,
    pub relative_path: CompactString,
    pub mime: CompactString,
    pub media_type: MediaType,
    pub content: Content,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: RecordId,
    pub name: CompactString,
    pub relative_path: CompactString,
    pub mime: CompactString,
    pub media_type: MediaType,
    pub content: Content,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    pub(crate) fn from_draft(id: RecordId, draft: RecordDraft) -> Self {
        Self {
            id,
            name: draft.name,
            relative_path: draft.relative_path,
            mime: draft.mime,
            media_type: draft.media_type,
            content: draft.content,
            size: draft.size,
            last_modified: draft.last_modified,
            created_at: Utc::now(),
            edited_at: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_textual(&self) -> bool {
        self.media_type.is_textual()
    }

    /// Text content, if the record is textual.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        if self.is_textual() {
            self.content.as_text()
        } else {
            None
        }
    }

    /// Directory part of `relative_path`, without trailing slash.
    #[must_use]
    pub fn directory(&self) -> Option<&str> {
        self.relative_path
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .filter(|dir| !dir.is_empty())
    }

    #[must_use]
    pub fn size_human(&self) -> String {
        ByteSize::b(self.size).to_string()
    }

    /// Same file as far as duplicate detection is concerned.
    #[must_use]
    pub fn is_equivalent(
        &self,
        name: &str,
        size: u64,
        last_modified: DateTime<Utc>,
        tolerance: Duration,
    ) -> bool {
        if self.name != name || self.size != size {
            return false;
        }
        let delta = (self.last_modified - last_modified).abs();
        delta.to_std().is_ok_and(|d| d <= tolerance)
    }

    /// Replace the leaf segment of the path, keeping its directory prefix.
    pub(crate) fn set_name(&mut self, new_name: &str) {
        self.relative_path = match self.directory() {
            Some(dir) => {
                let mut path = CompactString::from(dir);
                path.push('/');
                path.push_str(new_name);
                path
            }
            None => CompactString::from(new_name),
        };
        self.name = CompactString::from(new_name);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn text_draft(path: &str, text: &str) -> RecordDraft {
        let name = path.rsplit('/').next().unwrap_or(path);
        RecordDraft {
            name: name.into(),
            relative_path: path.into(),
            mime: "text/plain".into(),
            media_type: MediaType::Text,
            content: Content::Text(text.to_string()),
            size: text.len() as u64,
            last_modified: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_split_segments_skips_empty() {
        let segs = split_segments("/a//b/c.txt/");
        assert_eq!(segs.as_slice(), &["a", "b", "c.txt"]);
        assert!(split_segments("").is_empty());
    }

    #[test]
    fn test_set_name_keeps_directory_prefix() {
        let mut record = FileRecord::from_draft(RecordId::new(1), text_draft("src/lib/a.rs", "x"));
        record.set_name("b.rs");
        assert_eq!(record.name, "b.rs");
        assert_eq!(record.relative_path, "src/lib/b.rs");

        let mut flat = FileRecord::from_draft(RecordId::new(2), text_draft("top.txt", "x"));
        flat.set_name("renamed.txt");
        assert_eq!(flat.relative_path, "renamed.txt");
    }

    #[test]
    fn test_equivalence_tolerance() {
        let record = FileRecord::from_draft(RecordId::new(1), text_draft("a.txt", "abc"));
        let base = record.last_modified;
        let tol = Duration::from_secs(1);

        assert!(record.is_equivalent("a.txt", 3, base, tol));
        assert!(record.is_equivalent("a.txt", 3, base + chrono::Duration::milliseconds(900), tol));
        assert!(!record.is_equivalent("a.txt", 3, base - chrono::Duration::seconds(2), tol));
        assert!(!record.is_equivalent("a.txt", 4, base, tol));
        assert!(!record.is_equivalent("b.txt", 3, base, tol));
    }
}
