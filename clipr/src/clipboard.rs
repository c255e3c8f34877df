use crate::config::ClipboardConfig;
use crate::error::{ClipError, ClipResult};
use crate::item::{ClipItem, ClipKind};
use bytesize::ByteSize;
use compact_str::CompactString;
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ClipBoard {
    items: HashMap<CompactString, ClipItem>,
    /// Newest last.
    item_order: Vec<CompactString>,
    config: ClipboardConfig,
    created_at: Instant,
}

impl ClipBoard {
    pub fn new(config: ClipboardConfig) -> Self {
        Self {
            items: HashMap::new(),
            item_order: Vec::new(),
            config,
            created_at: Instant::now(),
        }
    }

    /// Put text on the clipboard and return the id of the entry holding it.
    ///
    /// Copying text identical to an existing entry moves that entry to the
    /// top instead of storing it twice.
    pub fn copy_text(
        &mut self,
        kind: ClipKind,
        label: impl Into<CompactString>,
        text: String,
    ) -> ClipResult<CompactString> {
        let label: CompactString = label.into();

        if text.is_empty() {
            return Err(ClipError::empty_text(label));
        }
        if text.len() > self.config.max_item_bytes {
            return Err(ClipError::ItemTooLarge {
                size: text.len(),
                max: self.config.max_item_bytes,
            });
        }

        self.purge_expired();

        if let Some(existing) = self
            .item_order
            .iter()
            .find(|id| self.items.get(*id).is_some_and(|item| item.text == text))
            .cloned()
        {
            self.item_order.retain(|id| *id != existing);
            self.item_order.push(existing.clone());
            if let Some(item) = self.items.get_mut(&existing) {
                item.added_at = Instant::now();
                item.kind = kind;
                item.label = label;
            }
            return Ok(existing);
        }

        let item = ClipItem::new(kind, label, text);
        let id = item.id.clone();

        debug!(
            kind = kind.tag(),
            size = %ByteSize::b(item.len() as u64),
            "Copied to clipboard"
        );

        self.insert_item(item);
        Ok(id)
    }

    /// Most recently copied entry.
    pub fn latest(&self) -> Option<&ClipItem> {
        self.item_order.last().and_then(|id| self.items.get(id))
    }

    pub fn get(&self, id: &str) -> Option<&ClipItem> {
        self.items.get(id)
    }

    pub fn remove_item(&mut self, id: &str) -> ClipResult<ClipItem> {
        let item = self
            .items
            .remove(id)
            .ok_or_else(|| ClipError::ItemNotFound(CompactString::from(id)))?;

        self.item_order.retain(|item_id| item_id != id);
        Ok(item)
    }

    /// All entries, newest first.
    pub fn items(&self) -> Vec<&ClipItem> {
        self.item_order
            .iter()
            .rev()
            .filter_map(|id| self.items.get(id))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.item_order.clear();
    }

    pub fn stats(&self) -> ClipboardStats {
        ClipboardStats::new(&self.items, self.created_at)
    }

    /// Drop entries older than the configured expiry.
    pub fn purge_expired(&mut self) -> usize {
        let Some(max_age) = self.config.item_expiry else {
            return 0;
        };

        let before = self.items.len();
        self.items.retain(|_, item| !item.is_expired(max_age));
        let items = &self.items;
        self.item_order.retain(|id| items.contains_key(id));
        before - self.items.len()
    }

    fn insert_item(&mut self, item: ClipItem) {
        // Enforce item limit, oldest first
        while self.items.len() >= self.config.max_items {
            if self.item_order.is_empty() {
                break;
            }
            let oldest_id = self.item_order.remove(0);
            self.items.remove(&oldest_id);
        }

        let id = item.id.clone();
        self.items.insert(id.clone(), item);
        self.item_order.push(id);
    }
}

impl Default for ClipBoard {
    fn default() -> Self {
        Self::new(ClipboardConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct ClipboardStats {
    pub total_items: usize,
    pub by_kind: HashMap<ClipKind, usize>,
    pub total_bytes: u64,
    pub created_at: Instant,
}

impl ClipboardStats {
    fn new(items: &HashMap<CompactString, ClipItem>, created_at: Instant) -> Self {
        let mut by_kind: HashMap<ClipKind, usize> = HashMap::new();
        let mut total_bytes: u64 = 0;

        for item in items.values() {
            *by_kind.entry(item.kind).or_insert(0) += 1;
            total_bytes += item.len() as u64;
        }

        Self {
            total_items: items.len(),
            by_kind,
            total_bytes,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_board(max_items: usize) -> ClipBoard {
        ClipBoard::new(ClipboardConfig {
            max_items,
            item_expiry: None,
            max_item_bytes: 16,
        })
    }

    #[test]
    fn test_copy_and_latest() {
        let mut board = small_board(5);
        let id = board
            .copy_text(ClipKind::FileContent, "a.txt", "hello".to_string())
            .unwrap();

        let latest = board.latest().unwrap();
        assert_eq!(latest.id, id);
        assert_eq!(latest.text, "hello");
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_identical_text_refreshes_existing_entry() {
        let mut board = small_board(5);
        let first = board
            .copy_text(ClipKind::FileContent, "a", "same".to_string())
            .unwrap();
        board
            .copy_text(ClipKind::Tree, "t", "other".to_string())
            .unwrap();
        let again = board
            .copy_text(ClipKind::Combined, "b", "same".to_string())
            .unwrap();

        assert_eq!(first, again);
        assert_eq!(board.len(), 2);
        let latest = board.latest().unwrap();
        assert_eq!(latest.kind, ClipKind::Combined);
        assert_eq!(latest.label, "b");
    }

    #[test]
    fn test_oldest_evicted_at_capacity() {
        let mut board = small_board(2);
        board.copy_text(ClipKind::Tree, "1", "one".into()).unwrap();
        board.copy_text(ClipKind::Tree, "2", "two".into()).unwrap();
        board.copy_text(ClipKind::Tree, "3", "three".into()).unwrap();

        let texts: Vec<&str> = board.items().iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["three", "two"]);
    }

    #[test]
    fn test_rejects_empty_and_oversized_text() {
        let mut board = small_board(2);
        assert!(matches!(
            board.copy_text(ClipKind::FileContent, "e", String::new()),
            Err(ClipError::EmptyText { .. })
        ));
        assert!(matches!(
            board.copy_text(ClipKind::FileContent, "big", "x".repeat(17)),
            Err(ClipError::ItemTooLarge { size: 17, max: 16 })
        ));
        assert!(board.is_empty());
    }

    #[test]
    fn test_remove_unknown_item() {
        let mut board = small_board(2);
        assert!(matches!(
            board.remove_item("nope"),
            Err(ClipError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_stats_by_kind() {
        let mut board = small_board(5);
        board.copy_text(ClipKind::Tree, "t", "abc".into()).unwrap();
        board.copy_text(ClipKind::ShellScript, "s", "de".into()).unwrap();

        let stats = board.stats();
        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.total_bytes, 5);
        assert_eq!(stats.by_kind.get(&ClipKind::Tree), Some(&1));
    }
}
