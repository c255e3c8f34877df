//! ``src/ingest/pipeline.rs``
//! ============================================================================
//! # Ingestion pipeline
//!
//! Turns host inputs into store records, one batch at a time:
//! discovery → per-file validation → timed read → commit. Each accepted file
//! is committed as soon as it is read, so partial progress is visible in the
//! store while the batch is still running. A file that fails never stops the
//! rest of the batch.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    config::IngestConfig,
    error::{DeckError, DeckResult, ReadFailure},
    ingest::{
        discover::discover,
        source::{HostEntry, RawFile},
        summary::{BatchSummary, FileOutcome, FileReport, IngestStage},
        validate::validate,
    },
    model::{
        media::{Content, MediaType},
        record::RecordDraft,
        store::SharedStore,
    },
};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Releases the in-flight flag when the batch ends, however it ends.
struct BatchGuard {
    flag: Arc<AtomicBool>,
}

impl BatchGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Cheap to clone; clones share the in-flight flag.
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    config: Arc<IngestConfig>,
    in_flight: Arc<AtomicBool>,
}

impl IngestPipeline {
    #[must_use]
    pub fn new(config: Arc<IngestConfig>) -> Self {
        Self {
            config,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// True while a batch is running.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Ingest one batch of host entries into `store`.
    ///
    /// Fails with [`DeckError::Busy`] if another batch is in flight; the
    /// request is not queued. Every other problem is reported per file in the
    /// returned summary.
    pub async fn run_batch(
        &self,
        store: &SharedStore,
        entries: Vec<HostEntry>,
        cancel: &CancellationToken,
    ) -> DeckResult<BatchSummary> {
        let Some(_guard) = BatchGuard::acquire(&self.in_flight) else {
            warn!("Rejected batch: another batch is in flight");
            return Err(DeckError::Busy);
        };

        let started = Instant::now();
        let mut summary = BatchSummary::default();

        // Enumerate everything before validating anything
        let mut files: Vec<RawFile> = Vec::new();
        let discovered = discover(entries, cancel.clone());
        tokio::pin!(discovered);
        while let Some(item) = discovered.next().await {
            match item {
                Ok(file) => files.push(file),
                Err(e) => summary.record_discovery_error(&e),
            }
        }
        summary.discovered = files.len();
        debug!(files = files.len(), "Discovery complete");

        let total = files.len();
        for (index, file) in files.into_iter().enumerate() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                summary.skipped = total - index;
                break;
            }

            let report = self.process(store, file).await;
            summary.record(report);

            tokio::task::yield_now().await;
        }
        if cancel.is_cancelled() {
            summary.cancelled = true;
        }

        summary.elapsed = started.elapsed();

        info!(
            marker = "INGEST_BATCH",
            discovered = summary.discovered,
            accepted = summary.accepted_count(),
            rejected = summary.rejected_count(),
            duplicates = summary.duplicates,
            failed = summary.failed_count(),
            cancelled = summary.cancelled,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "{}",
            summary.message()
        );

        Ok(summary)
    }

    async fn process(&self, store: &SharedStore, file: RawFile) -> FileReport {
        let mut report = FileReport::new(file.display_path());

        report.advance(IngestStage::Validating);
        let verdict = {
            let guard = store.read();
            validate(&file, &guard, &self.config)
        };
        let media = match verdict {
            Ok(media) => media,
            Err(reason) => {
                warn!(path = %report.path, %reason, "Rejected file");
                return report.finish(FileOutcome::Rejected(reason));
            }
        };

        report.advance(IngestStage::Reading);
        let bytes = match self.read(&file).await {
            Ok(bytes) => bytes,
            Err(failure) => {
                error!(path = %report.path, %failure, "Failed to read file");
                return report.finish(FileOutcome::Failed(failure));
            }
        };

        let draft = RecordDraft {
            content: materialize(media, &file.mime, bytes),
            name: file.name,
            relative_path: file.relative_path,
            mime: file.mime,
            media_type: media,
            size: file.size,
            last_modified: file.last_modified,
        };

        let committed = store.write().add(draft);
        match committed {
            Ok(id) => report.finish(FileOutcome::Accepted(id)),
            Err(DeckError::Validation(reason)) => report.finish(FileOutcome::Rejected(reason)),
            Err(other) => {
                error!(path = %report.path, error = %other, "Failed to commit file");
                report.finish(FileOutcome::Failed(ReadFailure::Io(other.to_string().into())))
            }
        }
    }

    async fn read(&self, file: &RawFile) -> Result<Bytes, ReadFailure> {
        let timeout = self.config.read_timeout;
        match tokio::time::timeout(timeout, file.source.read_bytes()).await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => Err(ReadFailure::Aborted),
            Ok(Err(e)) => Err(ReadFailure::Io(e.to_string().into())),
            Err(_) => Err(ReadFailure::Timeout(timeout)),
        }
    }
}

/// Convert raw bytes into the content form for `media`.
fn materialize(media: MediaType, mime: &str, bytes: Bytes) -> Content {
    if media.is_displayable() {
        let mime = if mime.is_empty() { FALLBACK_MIME } else { mime };
        Content::Encoded(format!("data:{mime};base64,{}", STANDARD.encode(&bytes)))
    } else if media.is_textual() {
        Content::Text(String::from_utf8_lossy(&bytes).into_owned())
    } else {
        Content::Bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::{MemoryDir, MemoryFile};
    use crate::ingest::summary::RejectClass;
    use crate::model::store::FileStore;
    use std::time::Duration;

    fn pipeline_with(config: IngestConfig) -> (IngestPipeline, SharedStore) {
        (
            IngestPipeline::new(Arc::new(config)),
            FileStore::default().shared(),
        )
    }

    fn pipeline() -> (IngestPipeline, SharedStore) {
        pipeline_with(IngestConfig::default())
    }

    #[tokio::test]
    async fn test_store_grows_by_exactly_accepted() {
        let (pipeline, store) = pipeline();
        store
            .write()
            .add(crate::model::record::tests::text_draft("existing.txt", "e"))
            .unwrap();
        let before = store.read().len();

        let entries = vec![
            MemoryFile::text("a.txt", "alpha").into_entry(),
            MemoryFile::text("b.txt", "").into_entry(),
            MemoryFile::new("c.exe", "application/x-msdownload", "MZ").into_entry(),
            MemoryFile::text("d.rs", "fn d() {}").into_entry(),
        ];

        let summary = pipeline
            .run_batch(&store, entries, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.discovered, 4);
        assert_eq!(summary.accepted_count(), 2);
        assert_eq!(store.read().len(), before + summary.accepted_count());
        assert_eq!(summary.rejected.get(&RejectClass::Empty), Some(&1));
        assert_eq!(summary.rejected.get(&RejectClass::UnsupportedType), Some(&1));
        assert!(!pipeline.is_processing());
    }

    #[tokio::test]
    async fn test_in_batch_duplicates_are_rejected() {
        let (pipeline, store) = pipeline();
        let entries = vec![
            MemoryFile::text("same.txt", "abc").into_entry(),
            MemoryFile::text("same.txt", "abc").into_entry(),
        ];

        let summary = pipeline
            .run_batch(&store, entries, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.accepted_count(), 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.rejected_count(), 0);
        assert_eq!(store.read().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_tolerance_is_one_second() {
        let (pipeline, store) = pipeline();
        let base = chrono::Utc::now();

        let first = vec![MemoryFile::text("t.txt", "abc").modified_at(base).into_entry()];
        pipeline
            .run_batch(&store, first, &CancellationToken::new())
            .await
            .unwrap();

        let again = vec![
            MemoryFile::text("t.txt", "abc")
                .modified_at(base + chrono::Duration::milliseconds(500))
                .into_entry(),
            MemoryFile::text("t.txt", "abc")
                .modified_at(base + chrono::Duration::seconds(5))
                .into_entry(),
            MemoryFile::text("t.txt", "abcd").modified_at(base).into_entry(),
            MemoryFile::text("u.txt", "abc").modified_at(base).into_entry(),
        ];
        let summary = pipeline
            .run_batch(&store, again, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.accepted_count(), 3);
    }

    #[tokio::test]
    async fn test_content_is_read_by_media_type() {
        let (pipeline, store) = pipeline();
        let entries = vec![
            MemoryFile::text("note.txt", "héllo").into_entry(),
            MemoryFile::new("pic.png", "image/png", vec![0x89u8, b'P', b'N', b'G']).into_entry(),
            MemoryFile::new("doc.pdf", "application/pdf", vec![1u8, 2, 3]).into_entry(),
        ];

        let summary = pipeline
            .run_batch(&store, entries, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.accepted_count(), 3);

        let store = store.read();
        let records = store.records();
        assert_eq!(records[0].content, Content::Text("héllo".to_string()));
        assert_eq!(records[0].media_type, MediaType::Text);
        assert_eq!(
            records[1].content,
            Content::Encoded("data:image/png;base64,iVBORw==".to_string())
        );
        assert_eq!(records[2].content, Content::Bytes(Bytes::from_static(&[1, 2, 3])));
        assert_eq!(records[2].media_type, MediaType::Binary);
    }

    #[tokio::test]
    async fn test_folder_drop_keeps_nesting() {
        let (pipeline, store) = pipeline();
        let dir = MemoryDir::new("site")
            .with_file(MemoryFile::text("index.html", "<h1>hi</h1>"))
            .with_dir(MemoryDir::new("css").with_file(MemoryFile::text("main.css", "body{}")));

        pipeline
            .run_batch(&store, vec![dir.into_entry()], &CancellationToken::new())
            .await
            .unwrap();

        let store = store.read();
        let paths: Vec<&str> = store.records().iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["site/index.html", "site/css/main.css"]);
        assert_eq!(store.records()[0].media_type, MediaType::Html);
        assert_eq!(store.records()[1].name, "main.css");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_and_failure_do_not_abort_batch() {
        let config = IngestConfig {
            read_timeout: Duration::from_secs(30),
            ..IngestConfig::default()
        };
        let (pipeline, store) = pipeline_with(config);

        let entries = vec![
            MemoryFile::text("slow.txt", "zzz")
                .slow(Duration::from_secs(60))
                .into_entry(),
            MemoryFile::text("broken.txt", "x").failing().into_entry(),
            MemoryFile::text("fine.txt", "ok").into_entry(),
        ];

        let summary = pipeline
            .run_batch(&store, entries, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.timed_out, 1);
        assert_eq!(summary.read_failures, 1);
        assert_eq!(summary.accepted_count(), 1);
        assert_eq!(store.read().records()[0].name, "fine.txt");
        assert_eq!(summary.reports[0].stage, IngestStage::Failed);
        assert_eq!(
            summary.reports[0].outcome,
            Some(FileOutcome::Failed(ReadFailure::Timeout(Duration::from_secs(30))))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_batch_is_rejected_while_busy() {
        let (pipeline, store) = pipeline();
        let slow = vec![
            MemoryFile::text("slow.txt", "zzz")
                .slow(Duration::from_secs(5))
                .into_entry(),
        ];

        let first = {
            let pipeline = pipeline.clone();
            let store = store.clone();
            tokio::spawn(async move {
                pipeline
                    .run_batch(&store, slow, &CancellationToken::new())
                    .await
            })
        };

        // let the first batch reach its read
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(pipeline.is_processing());

        let second = pipeline
            .run_batch(
                &store,
                vec![MemoryFile::text("b.txt", "b").into_entry()],
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(second, Err(DeckError::Busy)));

        let summary = first.await.unwrap().unwrap();
        assert_eq!(summary.accepted_count(), 1);
        assert!(!pipeline.is_processing());

        // flag released: a new batch runs normally
        let third = pipeline
            .run_batch(
                &store,
                vec![MemoryFile::text("c.txt", "c").into_entry()],
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(third.accepted_count(), 1);
        assert_eq!(store.read().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_progress_is_visible_before_batch_ends() {
        let (pipeline, store) = pipeline();
        let entries = vec![
            MemoryFile::text("first.txt", "1").into_entry(),
            MemoryFile::text("second.txt", "2")
                .slow(Duration::from_millis(200))
                .into_entry(),
        ];

        let handle = {
            let pipeline = pipeline.clone();
            let store = store.clone();
            tokio::spawn(async move {
                pipeline
                    .run_batch(&store, entries, &CancellationToken::new())
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.read().len(), 1);

        handle.await.unwrap().unwrap();
        assert_eq!(store.read().len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_batch_keeps_committed_files() {
        let (pipeline, store) = pipeline();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = pipeline
            .run_batch(
                &store,
                vec![MemoryFile::text("a.txt", "a").into_entry()],
                &cancel,
            )
            .await
            .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.accepted_count(), 0);
        assert!(store.read().is_empty());
        assert!(!pipeline.is_processing());
    }
}
