//! ``src/tree/node.rs``
//!
//! Recursive tree nodes and their text and row renderings.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use compact_str::CompactString;

use crate::model::record::RecordId;

pub type Children = BTreeMap<CompactString, TreeNode>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Directory(Children),
    Leaf(RecordId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Directory,
    File(RecordId),
}

/// One line of a flattened tree view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub depth: usize,
    pub name: CompactString,
    pub kind: RowKind,
}

impl TreeNode {
    #[must_use]
    pub fn directory() -> Self {
        Self::Directory(Children::new())
    }

    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    #[must_use]
    pub const fn children(&self) -> Option<&Children> {
        match self {
            Self::Directory(children) => Some(children),
            Self::Leaf(_) => None,
        }
    }

    /// Children in display order: directories first, then files, each
    /// lexicographic by segment.
    pub fn ordered_children(&self) -> impl Iterator<Item = (&CompactString, &TreeNode)> {
        let children = self.children().into_iter().flatten();
        let dirs = children.clone().filter(|(_, n)| n.is_directory());
        let files = children.filter(|(_, n)| !n.is_directory());
        dirs.chain(files)
    }

    #[must_use]
    pub fn file_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Directory(children) => children.values().map(Self::file_count).sum(),
        }
    }

    /// Directories below this node, not counting itself.
    #[must_use]
    pub fn dir_count(&self) -> usize {
        self.children().map_or(0, |children| {
            children
                .values()
                .filter(|n| n.is_directory())
                .map(|n| 1 + n.dir_count())
                .sum()
        })
    }

    /// Depth-first rows in display order.
    #[must_use]
    pub fn rows(&self) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        self.collect_rows(0, &mut rows);
        rows
    }

    fn collect_rows(&self, depth: usize, rows: &mut Vec<TreeRow>) {
        for (name, node) in self.ordered_children() {
            let kind = match node {
                Self::Directory(_) => RowKind::Directory,
                Self::Leaf(id) => RowKind::File(*id),
            };
            rows.push(TreeRow {
                depth,
                name: name.clone(),
                kind,
            });
            node.collect_rows(depth + 1, rows);
        }
    }

    /// Text rendering with box-drawing connectors.
    ///
    /// Top-level entries carry no connector; directories end with `/`.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for (name, node) in self.ordered_children() {
            push_label(&mut out, name, node);
            node.render_children(&mut out, "");
        }
        out
    }

    fn render_children(&self, out: &mut String, prefix: &str) {
        let mut children = self.ordered_children().peekable();
        while let Some((name, node)) = children.next() {
            let last = children.peek().is_none();
            out.push_str(prefix);
            out.push_str(if last { "└── " } else { "├── " });
            push_label(out, name, node);

            let nested = format!("{prefix}{}", if last { "    " } else { "│   " });
            node.render_children(out, &nested);
        }
    }
}

fn push_label(out: &mut String, name: &str, node: &TreeNode) {
    let _ = writeln!(out, "{name}{}", if node.is_directory() { "/" } else { "" });
}
