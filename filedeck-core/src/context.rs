//! ``src/context.rs``
//! ============================================================================
//! # `FileDeck`: the explicit context object
//!
//! Owns the store, the search index and the ingestion pipeline, and holds
//! the collaborators (notifier, clipboard, preferences) it was built with.
//! A presentation layer drives everything through this type.
//!
//! Single-record operations that fail are reported to the notifier and the
//! recent-errors log, leave state unchanged, and return the error.

use std::sync::Arc;

use clipr::ClipKind;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::{Config, Theme, ViewMode};
use crate::error::{DeckError, DeckResult};
use crate::export::{self, ClipboardSink};
use crate::ingest::{
    pipeline::IngestPipeline,
    source::HostEntry,
    summary::{BatchSummary, plural},
};
use crate::model::{
    record::RecordId,
    store::{FileStore, SharedStore, SortOrder, StoreStats},
};
use crate::notify::{Notification, NotificationLevel, Notifier};
use crate::prefs::Preferences;
use crate::search::{SearchIndex, SearchMatch};
use crate::tree::projector::{Projection, TreeProjector};

pub struct FileDeck {
    config: Arc<Config>,
    store: SharedStore,
    search: SearchIndex,
    pipeline: IngestPipeline,
    notifier: Arc<dyn Notifier>,
    clipboard: Arc<dyn ClipboardSink>,
    prefs: Preferences,
    view_mode: ViewMode,
    theme: Theme,
}

impl std::fmt::Debug for FileDeck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDeck")
            .field("records", &self.store.read().len())
            .field("search_term", &self.search.term())
            .field("view_mode", &self.view_mode)
            .field("theme", &self.theme)
            .finish_non_exhaustive()
    }
}

impl FileDeck {
    /// Build a deck. A theme stored in `prefs` wins over the configured default.
    pub fn new(
        config: Config,
        notifier: Arc<dyn Notifier>,
        clipboard: Arc<dyn ClipboardSink>,
        prefs: Preferences,
    ) -> Self {
        let theme = prefs.theme().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read stored theme");
            None
        });
        let theme = theme.unwrap_or(config.theme);

        let store = FileStore::new(config.ingest.duplicate_tolerance).shared();
        let pipeline = IngestPipeline::new(Arc::new(config.ingest.clone()));

        Self {
            view_mode: config.view.default_mode,
            config: Arc::new(config),
            store,
            search: SearchIndex::new(),
            pipeline,
            notifier,
            clipboard,
            prefs,
            theme,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the store, for renderers and background batches.
    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Run `f` with read access to the store.
    pub fn with_store<R>(&self, f: impl FnOnce(&FileStore) -> R) -> R {
        f(&self.store.read())
    }

    #[must_use]
    pub fn pipeline(&self) -> &IngestPipeline {
        &self.pipeline
    }

    #[must_use]
    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.store.read().stats()
    }

    // ------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------

    fn notify(&self, message: impl Into<compact_str::CompactString>, level: NotificationLevel) {
        let mut notification = Notification::new(message, level);
        if level != NotificationLevel::Error {
            notification = notification.with_duration(self.config.notifications.default_duration);
        }
        self.notifier.notify(notification);
    }

    fn log_error(&self, message: String) {
        if let Err(e) = self.prefs.push_error(message) {
            warn!(error = %e, "Could not persist error");
        }
    }

    fn report<T>(&self, result: DeckResult<T>) -> DeckResult<T> {
        if let Err(err) = &result {
            if err.is_user_error() {
                warn!(error = %err, "Operation rejected");
            } else {
                error!(error = %err, "Operation failed");
            }
            let message = err.to_string();
            self.notify(message.clone(), NotificationLevel::Error);
            self.log_error(message);
        }
        result
    }

    // ------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------

    pub async fn ingest(&self, entries: Vec<HostEntry>) -> DeckResult<BatchSummary> {
        self.ingest_with_cancel(entries, &CancellationToken::new())
            .await
    }

    /// Run one batch and notify its summary.
    ///
    /// A concurrent call fails with [`DeckError::Busy`].
    pub async fn ingest_with_cancel(
        &self,
        entries: Vec<HostEntry>,
        cancel: &CancellationToken,
    ) -> DeckResult<BatchSummary> {
        let summary = match self.pipeline.run_batch(&self.store, entries, cancel).await {
            Ok(summary) => summary,
            Err(err) => {
                self.notify(err.to_string(), NotificationLevel::Warning);
                return Err(err);
            }
        };

        let message = summary.message();
        let level = summary.severity();
        if summary.rejected_count() + summary.failed_count() > 0 {
            self.log_error(message.clone());
        }
        self.notify(message, level);
        Ok(summary)
    }

    // ------------------------------------------------------------
    // Record mutations
    // ------------------------------------------------------------

    pub fn rename(&self, id: RecordId, new_name: &str) -> DeckResult<()> {
        let result = self.store.write().rename(id, new_name);
        self.report(result)
    }

    pub fn edit_content(&self, id: RecordId, text: String) -> DeckResult<()> {
        let result = self.store.write().edit_content(id, text);
        self.report(result)
    }

    /// Remove one record; unknown ids are ignored.
    pub fn remove(&self, id: RecordId) -> bool {
        self.store.write().remove(id).is_some()
    }

    pub fn delete_all_files(&self) -> usize {
        let removed = self.store.write().remove_all();
        if removed > 0 {
            self.notify(
                format!("Deleted {}", plural(removed, "file")),
                NotificationLevel::Info,
            );
        }
        removed
    }

    pub fn delete_selected(&self) -> usize {
        let removed = self.store.write().delete_selected();
        if removed > 0 {
            self.notify(
                format!("Deleted {}", plural(removed, "selected file")),
                NotificationLevel::Info,
            );
        }
        removed
    }

    pub fn move_record(&self, from: usize, to: usize) -> bool {
        self.store.write().move_record(from, to)
    }

    pub fn sort(&self, order: SortOrder) {
        info!(%order, "Sorting records");
        self.store.write().sort(order);
    }

    // ------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------

    pub fn select(&self, id: RecordId) -> DeckResult<()> {
        let result = self.store.write().select(id);
        self.report(result)
    }

    pub fn deselect(&self, id: RecordId) -> bool {
        self.store.write().deselect(id)
    }

    pub fn toggle_selection(&self, id: RecordId) -> DeckResult<bool> {
        let result = self.store.write().toggle_selection(id);
        self.report(result)
    }

    pub fn select_all(&self) {
        self.store.write().select_all();
    }

    pub fn clear_selection(&self) {
        self.store.write().clear_selection();
    }

    // ------------------------------------------------------------
    // Search
    // ------------------------------------------------------------

    /// Index brought up to date with the store.
    pub fn search(&mut self) -> &SearchIndex {
        self.search.sync(&self.store.read());
        &self.search
    }

    /// Set the term and return the number of matches.
    pub fn set_search_term(&mut self, term: &str) -> usize {
        self.search.set_term(term);
        self.search().len()
    }

    pub fn search_next(&mut self) -> Option<SearchMatch> {
        self.search.sync(&self.store.read());
        self.search.next().copied()
    }

    pub fn search_prev(&mut self) -> Option<SearchMatch> {
        self.search.sync(&self.store.read());
        self.search.prev().copied()
    }

    // ------------------------------------------------------------
    // Tree
    // ------------------------------------------------------------

    #[must_use]
    pub fn tree(&self) -> Projection {
        let store = self.store.read();
        TreeProjector::build(store.records(), self.config.view.tree_uses_relative_paths)
    }

    #[must_use]
    pub fn tree_text(&self) -> String {
        self.tree().render_text()
    }

    // ------------------------------------------------------------
    // Clipboard exports
    // ------------------------------------------------------------

    fn copy(&self, kind: ClipKind, label: &str, text: String) -> DeckResult<()> {
        let result = self.clipboard.copy_text(kind, label, text);
        if result.is_ok() {
            self.notify(format!("Copied {label}"), NotificationLevel::Success);
        }
        self.report(result)
    }

    pub fn copy_content(&self, id: RecordId) -> DeckResult<()> {
        let prepared = {
            let store = self.store.read();
            store
                .get(id)
                .ok_or(DeckError::NotFound(id))
                .and_then(|record| {
                    export::content_text(record).map(|text| (record.name.clone(), text.to_string()))
                })
        };
        let (name, text) = self.report(prepared)?;
        self.copy(ClipKind::FileContent, &name, text)
    }

    /// Combined text of the selection, or of every record when nothing is selected.
    pub fn copy_combined(&self) -> DeckResult<()> {
        let (count, text) = {
            let store = self.store.read();
            let records = scope(&store);
            (records.len(), export::combined_text(records))
        };
        self.copy(ClipKind::Combined, &format!("{count} files"), text)
    }

    pub fn copy_tree(&self) -> DeckResult<()> {
        let projection = self.tree();
        self.warn_left_out(projection.conflicts.len(), "tree");
        self.copy(ClipKind::Tree, "tree", projection.render_text())
    }

    /// Shell script for the selection, or for every record when nothing is selected.
    pub fn copy_script(&self) -> DeckResult<()> {
        let (count, script) = {
            let store = self.store.read();
            let records = scope(&store);
            (records.len(), export::shell_script(records))
        };
        self.warn_left_out(script.conflicts.len(), "shell script");
        let label = format!("script for {}", plural(count - script.conflicts.len(), "file"));
        self.copy(ClipKind::ShellScript, &label, script.text)
    }

    fn warn_left_out(&self, conflicts: usize, target: &str) {
        if conflicts > 0 {
            self.notify(
                format!("{} left out of the {target} (path conflicts)", plural(conflicts, "file")),
                NotificationLevel::Warning,
            );
        }
    }

    // ------------------------------------------------------------
    // Presentation state
    // ------------------------------------------------------------

    #[must_use]
    pub const fn theme(&self) -> Theme {
        self.theme
    }

    #[instrument(level = "debug", skip(self))]
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        if let Err(e) = self.prefs.set_theme(theme) {
            warn!(error = %e, "Could not persist theme");
            self.notify(format!("Theme not saved: {e}"), NotificationLevel::Warning);
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.set_theme(self.theme.toggled());
        self.theme
    }

    #[must_use]
    pub const fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub const fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub const fn cycle_view_mode(&mut self) -> ViewMode {
        self.view_mode = self.view_mode.next();
        self.view_mode
    }
}

/// Selected records, or all of them when the selection is empty.
fn scope(store: &FileStore) -> Vec<&crate::model::record::FileRecord> {
    let selected = store.selected_records();
    if selected.is_empty() {
        store.records().iter().collect()
    } else {
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::{MemoryDir, MemoryFile};
    use crate::model::media::{Content, MediaType};
    use crate::notify::NotificationLog;
    use crate::prefs::MemoryPreferences;
    use clipr::{ClipBoard, ClipboardConfig};
    use parking_lot::Mutex;
    use std::time::Duration;

    struct Harness {
        deck: FileDeck,
        log: NotificationLog,
        clipboard: Arc<Mutex<ClipBoard>>,
    }

    fn harness() -> Harness {
        let log = NotificationLog::new();
        let clipboard = Arc::new(Mutex::new(ClipBoard::new(ClipboardConfig::default())));
        let deck = FileDeck::new(
            Config::default(),
            Arc::new(log.clone()),
            clipboard.clone(),
            Preferences::new(Arc::new(MemoryPreferences::new()), 10),
        );
        Harness {
            deck,
            log,
            clipboard,
        }
    }

    fn clipboard_text(h: &Harness) -> String {
        h.clipboard.lock().latest().unwrap().text.clone()
    }

    async fn ingest_texts(h: &Harness, files: &[(&str, &str)]) -> Vec<RecordId> {
        let entries = files
            .iter()
            .map(|(name, text)| MemoryFile::text(name, text).into_entry())
            .collect();
        h.deck.ingest(entries).await.unwrap().accepted
    }

    #[tokio::test]
    async fn test_ingest_notifies_summary() {
        let h = harness();
        let ids = ingest_texts(&h, &[("a.txt", "alpha"), ("b.txt", "")]).await;

        assert_eq!(ids.len(), 1);
        let last = h.log.last().unwrap();
        assert_eq!(last.level, NotificationLevel::Warning);
        assert!(last.message.starts_with("Added 1 file"));
        assert_eq!(h.deck.preferences().recent_errors().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_ingest_is_busy() {
        let h = harness();
        let slow = MemoryFile::text("slow.txt", "zzz")
            .slow(Duration::from_secs(2))
            .into_entry();
        let quick = MemoryFile::text("quick.txt", "q").into_entry();

        let (first, second) = tokio::join!(h.deck.ingest(vec![slow]), h.deck.ingest(vec![quick]));

        assert_eq!(first.unwrap().accepted_count(), 1);
        assert!(matches!(second, Err(DeckError::Busy)));
        assert!(!h.deck.pipeline().is_processing());
        assert_eq!(h.deck.stats().count, 1);
    }

    #[tokio::test]
    async fn test_delete_all_clears_selection() {
        let h = harness();
        ingest_texts(&h, &[("a.txt", "1"), ("b.txt", "22")]).await;
        h.deck.select_all();
        assert_eq!(h.deck.stats().selected, 2);

        assert_eq!(h.deck.delete_all_files(), 2);
        h.deck.with_store(|store| {
            assert!(store.is_empty());
            assert_eq!(store.selection().count(), 0);
        });
    }

    #[tokio::test]
    async fn test_delete_messages_are_pluralized() {
        let h = harness();
        let ids = ingest_texts(&h, &[("a.txt", "1"), ("b.txt", "22"), ("c.txt", "333")]).await;

        h.deck.select(ids[0]).unwrap();
        assert_eq!(h.deck.delete_selected(), 1);
        assert_eq!(h.log.last().unwrap().message, "Deleted 1 selected file");

        assert_eq!(h.deck.delete_all_files(), 2);
        assert_eq!(h.log.last().unwrap().message, "Deleted 2 files");
    }

    #[tokio::test]
    async fn test_script_leaves_out_clashing_paths() {
        let h = harness();
        let entries = vec![
            MemoryFile::new("a", "text/plain", "plain\n").into_entry(),
            MemoryDir::new("a")
                .with_file(MemoryFile::text("b.txt", "nested\n"))
                .into_entry(),
        ];
        assert_eq!(h.deck.ingest(entries).await.unwrap().accepted.len(), 2);

        h.deck.copy_script().unwrap();
        let script = clipboard_text(&h);
        assert!(script.contains("# Skipped a/b.txt: clashes at a\n"));
        assert!(!script.contains("mkdir -p 'a'"));

        let warning = h
            .log
            .snapshot()
            .into_iter()
            .rev()
            .find(|n| n.level == NotificationLevel::Warning)
            .unwrap();
        assert_eq!(warning.message, "1 file left out of the shell script (path conflicts)");
    }

    #[tokio::test]
    async fn test_unknown_id_is_notified_and_logged() {
        let h = harness();
        let missing = RecordId::new(99);

        assert!(matches!(h.deck.rename(missing, "x.txt"), Err(DeckError::NotFound(_))));
        assert!(!h.deck.remove(missing));

        let last = h.log.last().unwrap();
        assert_eq!(last.level, NotificationLevel::Error);
        assert!(last.duration.is_none());
        let errors = h.deck.preferences().recent_errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("#99"));
    }

    #[tokio::test]
    async fn test_rename_rejection_leaves_name() {
        let h = harness();
        let ids = ingest_texts(&h, &[("keep.txt", "k")]).await;

        assert!(h.deck.rename(ids[0], "bad:name").is_err());
        h.deck
            .with_store(|store| assert_eq!(store.get(ids[0]).unwrap().name, "keep.txt"));
    }

    #[tokio::test]
    async fn test_editing_image_is_rejected() {
        let h = harness();
        let entries = vec![MemoryFile::new("p.png", "image/png", vec![1u8, 2, 3]).into_entry()];
        let id = h.deck.ingest(entries).await.unwrap().accepted[0];

        let err = h.deck.edit_content(id, "text".into()).unwrap_err();
        assert!(matches!(err, DeckError::NotEditable { media: MediaType::Image, .. }));
        h.deck.with_store(|store| {
            let record = store.get(id).unwrap();
            assert_eq!(record.size, 3);
            assert!(matches!(record.content, Content::Encoded(_)));
        });
    }

    #[tokio::test]
    async fn test_search_follows_edits() {
        let mut h = harness();
        let ids = ingest_texts(&h, &[("a.md", "one fish"), ("b.md", "two fish")]).await;

        assert_eq!(h.deck.set_search_term("FISH"), 2);
        assert_eq!(h.deck.search_next().unwrap().record_id, ids[1]);

        h.deck.edit_content(ids[0], "fish fish fish".into()).unwrap();
        assert_eq!(h.deck.search().len(), 4);
        assert_eq!(h.deck.search().status().as_deref(), Some("1 / 4"));
        assert_eq!(h.deck.search_prev().unwrap().record_id, ids[1]);

        h.deck.set_search_term("");
        assert!(!h.deck.search().is_navigation_visible());
    }

    #[tokio::test]
    async fn test_exports_reach_clipboard() {
        let h = harness();
        let ids = ingest_texts(&h, &[("a.txt", "alpha\n"), ("b.txt", "beta\n")]).await;

        h.deck.copy_content(ids[0]).unwrap();
        assert_eq!(clipboard_text(&h), "alpha\n");

        h.deck.toggle_selection(ids[1]).unwrap();
        h.deck.copy_combined().unwrap();
        assert_eq!(clipboard_text(&h), "=== b.txt ===\nbeta\n");

        h.deck.clear_selection();
        h.deck.copy_script().unwrap();
        let script = clipboard_text(&h);
        assert!(script.contains("cat > 'a.txt'"));
        assert!(script.contains("cat > 'b.txt'"));

        h.deck.copy_tree().unwrap();
        assert_eq!(clipboard_text(&h), "a.txt\nb.txt\n");
        assert_eq!(h.log.last().unwrap().level, NotificationLevel::Success);
    }

    #[test]
    fn test_theme_persisted_and_view_cycles() {
        let store = Arc::new(MemoryPreferences::new());
        let prefs = Preferences::new(store.clone(), 10);
        let mut deck = FileDeck::new(
            Config::default(),
            Arc::new(NotificationLog::new()),
            Arc::new(Mutex::new(ClipBoard::default())),
            prefs.clone(),
        );

        assert_eq!(deck.theme(), Theme::Light);
        assert_eq!(deck.toggle_theme(), Theme::Dark);
        assert_eq!(prefs.theme().unwrap(), Some(Theme::Dark));

        let reopened = FileDeck::new(
            Config::default(),
            Arc::new(NotificationLog::new()),
            Arc::new(Mutex::new(ClipBoard::default())),
            prefs,
        );
        assert_eq!(reopened.theme(), Theme::Dark);

        assert_eq!(deck.view_mode(), ViewMode::List);
        assert_eq!(deck.cycle_view_mode(), ViewMode::Grid);
        deck.set_view_mode(ViewMode::Tree);
        assert_eq!(deck.view_mode(), ViewMode::Tree);
    }
}
