//! ``src/search/index.rs``
//! ============================================================================
//! # `SearchIndex`: substring matches with a navigable cursor
//!
//! Matches are derived data: they are thrown away and rebuilt in full
//! whenever the term or the store changes, never patched.

use compact_str::CompactString;
use memchr::memmem::Finder;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::model::{
    record::{FileRecord, RecordId},
    store::FileStore,
};
use crate::search::fold::{Folded, finder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchField {
    Name,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub record_id: RecordId,
    pub field: MatchField,
    /// Byte offset into the original field text.
    pub offset: usize,
    /// 0-based occurrence number within `(record_id, field)`.
    pub occurrence_index: usize,
}

#[derive(Debug, Default)]
pub struct SearchIndex {
    term: CompactString,
    needle: Option<Finder<'static>>,
    matches: Vec<SearchMatch>,
    cursor: usize,
    synced_revision: Option<u64>,
}

impl SearchIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Set the search term. Returns `false` if it did not change.
    ///
    /// Matches are cleared immediately; call [`Self::sync`] or
    /// [`Self::recompute`] to fill them again.
    pub fn set_term(&mut self, term: &str) -> bool {
        if self.term == term {
            return false;
        }

        self.term = CompactString::from(term);
        self.needle = (!term.is_empty()).then(|| finder(term));
        self.matches.clear();
        self.cursor = 0;
        self.synced_revision = None;
        true
    }

    pub fn clear(&mut self) {
        self.set_term("");
    }

    /// Rescan `records` from scratch. The cursor goes back to the first match.
    #[instrument(level = "debug", skip_all, fields(term = %self.term, records = records.len()))]
    pub fn recompute(&mut self, records: &[FileRecord]) -> usize {
        self.matches.clear();
        self.cursor = 0;

        let Some(needle) = &self.needle else {
            return 0;
        };

        for record in records {
            collect(&mut self.matches, needle, record.id, MatchField::Name, &record.name);
            if let Some(text) = record.text() {
                collect(&mut self.matches, needle, record.id, MatchField::Content, text);
            }
        }

        debug!(matches = self.matches.len(), "Search recomputed");
        self.matches.len()
    }

    /// Recompute only if the term or the store changed since the last sync.
    pub fn sync(&mut self, store: &FileStore) -> bool {
        if self.synced_revision == Some(store.revision()) {
            return false;
        }
        self.recompute(store.records());
        self.synced_revision = Some(store.revision());
        true
    }

    #[must_use]
    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    pub fn matches_for(&self, id: RecordId) -> impl Iterator<Item = &SearchMatch> + '_ {
        self.matches.iter().filter(move |m| m.record_id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        (!self.matches.is_empty()).then_some(self.cursor)
    }

    #[must_use]
    pub fn current(&self) -> Option<&SearchMatch> {
        self.matches.get(self.cursor)
    }

    pub fn next(&mut self) -> Option<&SearchMatch> {
        if self.matches.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + 1) % self.matches.len();
        self.current()
    }

    pub fn prev(&mut self) -> Option<&SearchMatch> {
        if self.matches.is_empty() {
            return None;
        }
        self.cursor = self
            .cursor
            .checked_sub(1)
            .unwrap_or(self.matches.len() - 1);
        self.current()
    }

    /// Navigation controls are shown only while a term is set.
    #[must_use]
    pub fn is_navigation_visible(&self) -> bool {
        !self.term.is_empty()
    }

    /// Cursor label such as `"3 / 12"`; `None` while navigation is hidden.
    #[must_use]
    pub fn status(&self) -> Option<String> {
        if !self.is_navigation_visible() {
            return None;
        }
        Some(match self.current_index() {
            Some(i) => format!("{} / {}", i + 1, self.matches.len()),
            None => "0 / 0".to_string(),
        })
    }
}

fn collect(
    out: &mut Vec<SearchMatch>,
    needle: &Finder<'_>,
    record_id: RecordId,
    field: MatchField,
    text: &str,
) {
    let folded = Folded::new(text);
    out.extend(
        folded
            .starts(needle)
            .enumerate()
            .map(|(occurrence_index, start)| SearchMatch {
                record_id,
                field,
                offset: folded.original_offset(start),
                occurrence_index,
            }),
    );
}
