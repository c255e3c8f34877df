//! ``src/tree/projector.rs``
//! ============================================================================
//! # `TreeProjector`: hierarchy from the flat record sequence
//!
//! The projection is rebuilt on demand from record paths and never cached.
//! A path that would put a file and a directory in the same slot, or two
//! files at the same path, is rejected: the first occupant stays and the
//! later record is listed in `Projection::conflicts`.

use std::collections::btree_map::Entry;

use compact_str::CompactString;
use tracing::{debug, warn};

use crate::error::DeckError;
use crate::model::record::{FileRecord, RecordId, split_segments};
use crate::tree::node::{Children, TreeNode, TreeRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// A file already occupies a segment this path needs as a directory,
    /// or the exact path.
    FileExists,
    /// The leaf segment is already a directory.
    DirectoryExists,
    /// The path has no segments.
    EmptyPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConflict {
    pub record_id: RecordId,
    /// Path the record asked for.
    pub path: CompactString,
    /// Prefix at which the clash was found.
    pub at: CompactString,
    pub kind: ConflictKind,
}

impl From<&TreeConflict> for DeckError {
    fn from(conflict: &TreeConflict) -> Self {
        Self::TreeConflict {
            path: conflict.path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub root: TreeNode,
    pub conflicts: Vec<TreeConflict>,
}

impl Projection {
    #[must_use]
    pub fn render_text(&self) -> String {
        self.root.render_text()
    }

    #[must_use]
    pub fn rows(&self) -> Vec<TreeRow> {
        self.root.rows()
    }

    #[must_use]
    pub fn file_count(&self) -> usize {
        self.root.file_count()
    }

    #[must_use]
    pub fn dir_count(&self) -> usize {
        self.root.dir_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.children().is_none_or(Children::is_empty)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TreeProjector;

impl TreeProjector {
    /// Build the tree from `relative_path`, or from the bare `name` when
    /// `use_relative_path` is false.
    #[must_use]
    pub fn build(records: &[FileRecord], use_relative_path: bool) -> Projection {
        let mut root = Children::new();
        let mut conflicts = Vec::new();

        for record in records {
            let path = if use_relative_path {
                &record.relative_path
            } else {
                &record.name
            };
            let segments = split_segments(path);

            if let Err((depth, kind)) = insert(&mut root, &segments, record.id) {
                let at = segments
                    .get(..=depth.min(segments.len().saturating_sub(1)))
                    .map(|s| s.join("/"))
                    .unwrap_or_default();
                warn!(record = %record.id, path = %path, at = %at, ?kind, "Tree conflict");
                conflicts.push(TreeConflict {
                    record_id: record.id,
                    path: path.clone(),
                    at: at.into(),
                    kind,
                });
            }
        }

        let root = TreeNode::Directory(root);
        debug!(
            files = root.file_count(),
            dirs = root.dir_count(),
            conflicts = conflicts.len(),
            "Tree projected"
        );
        Projection { root, conflicts }
    }
}

fn insert(
    root: &mut Children,
    segments: &[&str],
    id: RecordId,
) -> Result<(), (usize, ConflictKind)> {
    let Some((leaf, dirs)) = segments.split_last() else {
        return Err((0, ConflictKind::EmptyPath));
    };

    let mut level = root;
    for (depth, segment) in dirs.iter().enumerate() {
        let node = level
            .entry(CompactString::from(*segment))
            .or_insert_with(TreeNode::directory);
        match node {
            TreeNode::Directory(children) => level = children,
            TreeNode::Leaf(_) => return Err((depth, ConflictKind::FileExists)),
        }
    }

    match level.entry(CompactString::from(*leaf)) {
        Entry::Vacant(slot) => {
            slot.insert(TreeNode::Leaf(id));
            Ok(())
        }
        Entry::Occupied(slot) => Err((
            dirs.len(),
            if slot.get().is_directory() {
                ConflictKind::DirectoryExists
            } else {
                ConflictKind::FileExists
            },
        )),
    }
}
