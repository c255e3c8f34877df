//! ``src/model/store.rs``
//! ============================================================================
//! # `FileStore`: ordered in-memory file records
//!
//! Owns record identity, duplicate detection, mutation (rename, edit, delete,
//! reorder) and the selection set. Every mutation bumps `revision`, which the
//! search index uses to know when its matches are stale.

use std::{cmp::Ordering, collections::BTreeMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    error::{DeckError, DeckResult, ValidationError},
    model::{
        media::{Content, MediaType},
        record::{FileRecord, RecordDraft, RecordId},
    },
};

/// Store shared between the context and an in-flight ingestion batch.
pub type SharedStore = Arc<RwLock<FileStore>>;

/// Characters never allowed in a file name.
pub const RESERVED_NAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Longest accepted file name, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// Check a leaf file name for emptiness, reserved and control characters.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidName {
        name: name.into(),
        reason: reason.into(),
    };

    if name.trim().is_empty() {
        return Err(invalid("name is empty"));
    }
    if name == "." || name == ".." {
        return Err(invalid("name is reserved"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("name is too long"));
    }
    if let Some(c) = name.chars().find(|c| RESERVED_NAME_CHARS.contains(c)) {
        return Err(ValidationError::InvalidName {
            name: name.into(),
            reason: format!("contains reserved character '{c}'").into(),
        });
    }
    if name.chars().any(char::is_control) {
        return Err(invalid("contains control characters"));
    }
    Ok(())
}

/// Sort mode for the record sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    NameAsc,
    NameDesc,
    SizeAsc,
    SizeDesc,
    CreatedAsc,
    CreatedDesc,
    MediaType,
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s: &'_ str = match self {
            Self::NameAsc => "name_asc",
            Self::NameDesc => "name_desc",
            Self::SizeAsc => "size_asc",
            Self::SizeDesc => "size_desc",
            Self::CreatedAsc => "created_asc",
            Self::CreatedDesc => "created_desc",
            Self::MediaType => "media_type",
        };

        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub count: usize,
    pub total_bytes: u64,
    pub selected: usize,
    pub by_media: BTreeMap<MediaType, usize>,
}

#[derive(Debug)]
pub struct FileStore {
    records: Vec<FileRecord>,
    selection: IndexSet<RecordId>,
    next_id: u64,
    revision: u64,
    duplicate_tolerance: Duration,
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl FileStore {
    #[must_use]
    pub fn new(duplicate_tolerance: Duration) -> Self {
        Self {
            records: Vec::new(),
            selection: IndexSet::new(),
            next_id: 1,
            revision: 0,
            duplicate_tolerance,
        }
    }

    #[must_use]
    pub fn shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    // ------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------

    #[must_use]
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Incremented by every mutation.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// Existing record equivalent to the described file, if any.
    #[must_use]
    pub fn find_duplicate(
        &self,
        name: &str,
        size: u64,
        last_modified: DateTime<Utc>,
    ) -> Option<&FileRecord> {
        self.records
            .iter()
            .find(|r| r.is_equivalent(name, size, last_modified, self.duplicate_tolerance))
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let mut by_media: BTreeMap<MediaType, usize> = BTreeMap::new();
        for record in &self.records {
            *by_media.entry(record.media_type).or_insert(0) += 1;
        }

        StoreStats {
            count: self.records.len(),
            total_bytes: self.records.iter().map(|r| r.size).sum(),
            selected: self.selection.len(),
            by_media,
        }
    }

    // ------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------

    /// Append a record at the end of the sequence.
    pub fn add(&mut self, draft: RecordDraft) -> DeckResult<RecordId> {
        if self
            .find_duplicate(&draft.name, draft.size, draft.last_modified)
            .is_some()
        {
            return Err(ValidationError::Duplicate { name: draft.name }.into());
        }

        let id = RecordId::new(self.next_id);
        self.next_id += 1;

        debug!(id = %id, path = %draft.relative_path, media = %draft.media_type, "Record added");

        self.records.push(FileRecord::from_draft(id, draft));
        self.touch();
        Ok(id)
    }

    /// Remove a record. Unknown ids are a no-op.
    pub fn remove(&mut self, id: RecordId) -> Option<FileRecord> {
        let index = self.position(id)?;
        let removed = self.records.remove(index);
        self.selection.shift_remove(&id);
        self.touch();
        Some(removed)
    }

    /// Drop every record and the selection.
    pub fn remove_all(&mut self) -> usize {
        let removed = self.records.len();
        self.records.clear();
        self.selection.clear();
        self.touch();
        removed
    }

    pub fn rename(&mut self, id: RecordId, new_name: &str) -> DeckResult<()> {
        validate_name(new_name)?;

        let (size, last_modified) = {
            let record = self.get(id).ok_or(DeckError::NotFound(id))?;
            (record.size, record.last_modified)
        };
        let clash = self.records.iter().any(|r| {
            r.id != id && r.is_equivalent(new_name, size, last_modified, self.duplicate_tolerance)
        });
        if clash {
            return Err(ValidationError::Duplicate {
                name: new_name.into(),
            }
            .into());
        }

        let record = self.get_mut(id)?;
        record.set_name(new_name);
        self.touch();
        Ok(())
    }

    /// Replace the text of a textual record.
    pub fn edit_content(&mut self, id: RecordId, text: String) -> DeckResult<()> {
        let record = self.get_mut(id)?;
        if !record.is_textual() {
            return Err(DeckError::NotEditable {
                id,
                media: record.media_type,
            });
        }

        record.size = text.len() as u64;
        record.content = Content::Text(text);
        record.edited_at = Some(Utc::now());
        self.touch();
        Ok(())
    }

    /// Move the record at `from` so it ends up at index `to`.
    ///
    /// Returns false (and changes nothing) when the indices are equal or out of bounds.
    pub fn move_record(&mut self, from: usize, to: usize) -> bool {
        let len = self.records.len();
        if from == to || from >= len || to >= len {
            return false;
        }

        let record = self.records.remove(from);
        self.records.insert(to, record);
        self.touch();
        true
    }

    pub fn sort(&mut self, order: SortOrder) {
        let cmp_name = |a: &FileRecord, b: &FileRecord| -> Ordering {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        };

        // Stable sorts keep the user's manual order among equal keys
        match order {
            SortOrder::NameAsc => self.records.sort_by(cmp_name),
            SortOrder::NameDesc => self.records.sort_by(|a, b| cmp_name(b, a)),
            SortOrder::SizeAsc => self.records.sort_by_key(|r| r.size),
            SortOrder::SizeDesc => self.records.sort_by(|a, b| b.size.cmp(&a.size)),
            SortOrder::CreatedAsc => self.records.sort_by_key(|r| r.created_at),
            SortOrder::CreatedDesc => self.records.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::MediaType => self
                .records
                .sort_by(|a, b| a.media_type.cmp(&b.media_type).then_with(|| cmp_name(a, b))),
        }
        self.touch();
    }

    // ------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------

    #[must_use]
    pub fn is_selected(&self, id: RecordId) -> bool {
        self.selection.contains(&id)
    }

    /// Selected ids, in the order they were selected.
    pub fn selection(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.selection.iter().copied()
    }

    /// Selected records, in store order.
    #[must_use]
    pub fn selected_records(&self) -> Vec<&FileRecord> {
        self.records
            .iter()
            .filter(|r| self.selection.contains(&r.id))
            .collect()
    }

    pub fn select(&mut self, id: RecordId) -> DeckResult<()> {
        if self.get(id).is_none() {
            return Err(DeckError::NotFound(id));
        }
        self.selection.insert(id);
        Ok(())
    }

    pub fn deselect(&mut self, id: RecordId) -> bool {
        self.selection.shift_remove(&id)
    }

    /// Flip selection of one record; returns the new state.
    pub fn toggle_selection(&mut self, id: RecordId) -> DeckResult<bool> {
        if self.selection.shift_remove(&id) {
            return Ok(false);
        }
        self.select(id)?;
        Ok(true)
    }

    pub fn select_all(&mut self) {
        self.selection = self.records.iter().map(|r| r.id).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Remove every selected record and clear the selection.
    pub fn delete_selected(&mut self) -> usize {
        let before = self.records.len();
        let selection = std::mem::take(&mut self.selection);
        self.records.retain(|r| !selection.contains(&r.id));
        self.touch();
        before - self.records.len()
    }

    fn get_mut(&mut self, id: RecordId) -> DeckResult<&mut FileRecord> {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(DeckError::NotFound(id))
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
