use compact_str::CompactString;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// What a clipboard entry was exported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipKind {
    /// Raw content of a single file.
    FileContent,
    /// Several files concatenated with name headers.
    Combined,
    /// Rendered directory tree.
    Tree,
    /// Shell script recreating the files.
    ShellScript,
}

impl ClipKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::FileContent => "F",
            Self::Combined => "C",
            Self::Tree => "T",
            Self::ShellScript => "S",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipItem {
    pub id: CompactString,
    pub kind: ClipKind,
    pub label: CompactString,
    pub text: String,
    pub added_at: Instant,
}

impl ClipItem {
    pub fn new(kind: ClipKind, label: impl Into<CompactString>, text: String) -> Self {
        Self {
            id: CompactString::from(Uuid::new_v4().to_string()),
            kind,
            label: label.into(),
            text,
            added_at: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// First line of the text, truncated to `max_chars`.
    pub fn preview(&self, max_chars: usize) -> String {
        let first = self.text.lines().next().unwrap_or("");
        let mut out: String = first.chars().take(max_chars).collect();
        if first.chars().count() > max_chars || self.text.lines().nth(1).is_some() {
            out.push('…');
        }
        out
    }

    pub fn is_expired(&self, max_age: Duration) -> bool {
        self.added_at.elapsed() > max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_and_marks_continuation() {
        let item = ClipItem::new(ClipKind::Combined, "all", "abcdef\nsecond".to_string());
        assert_eq!(item.preview(3), "abc…");
        assert_eq!(item.preview(10), "abcdef…");

        let single = ClipItem::new(ClipKind::FileContent, "a.txt", "short".to_string());
        assert_eq!(single.preview(10), "short");
    }

    #[test]
    fn test_ids_are_unique() {
        let a = ClipItem::new(ClipKind::Tree, "t", "x".to_string());
        let b = ClipItem::new(ClipKind::Tree, "t", "x".to_string());
        assert_ne!(a.id, b.id);
    }
}
