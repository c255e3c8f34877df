//! ``src/ingest/summary.rs``
//!
//! Per-file reports and the batch summary that the pipeline hands back to
//! the caller once a batch finishes.

use std::{collections::BTreeMap, fmt::Write as _, time::Duration};

use compact_str::CompactString;
use tracing::trace;

use crate::error::{DeckError, ReadFailure, ValidationError};
use crate::model::record::RecordId;
use crate::notify::NotificationLevel;

/// Lifecycle of one input inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Pending,
    Validating,
    Rejected,
    Reading,
    Materialized,
    /// Read timed out or failed.
    Failed,
}

impl IngestStage {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Materialized | Self::Failed)
    }
}

/// Validation failure classes tallied in the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RejectClass {
    Empty,
    TooLarge,
    UnsupportedType,
    UnsafeName,
    Duplicate,
}

impl RejectClass {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TooLarge => "too large",
            Self::UnsupportedType => "unsupported type",
            Self::UnsafeName => "unsafe name",
            Self::Duplicate => "duplicate",
        }
    }
}

impl From<&ValidationError> for RejectClass {
    fn from(err: &ValidationError) -> Self {
        match err {
            ValidationError::EmptyFile => Self::Empty,
            ValidationError::TooLarge { .. } => Self::TooLarge,
            ValidationError::UnsupportedType { .. } => Self::UnsupportedType,
            ValidationError::InvalidName { .. } => Self::UnsafeName,
            ValidationError::Duplicate { .. } => Self::Duplicate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Accepted(RecordId),
    Rejected(ValidationError),
    Failed(ReadFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: CompactString,
    pub stage: IngestStage,
    pub outcome: Option<FileOutcome>,
}

impl FileReport {
    pub(crate) fn new(path: impl Into<CompactString>) -> Self {
        Self {
            path: path.into(),
            stage: IngestStage::Pending,
            outcome: None,
        }
    }

    pub(crate) fn advance(&mut self, stage: IngestStage) {
        trace!(path = %self.path, from = ?self.stage, to = ?stage, "Ingest stage");
        self.stage = stage;
    }

    pub(crate) fn finish(mut self, outcome: FileOutcome) -> Self {
        let stage = match &outcome {
            FileOutcome::Accepted(_) => IngestStage::Materialized,
            FileOutcome::Rejected(_) => IngestStage::Rejected,
            FileOutcome::Failed(_) => IngestStage::Failed,
        };
        self.advance(stage);
        self.outcome = Some(outcome);
        self
    }

    /// Human-readable reason for a rejected or failed file.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        match self.outcome.as_ref()? {
            FileOutcome::Accepted(_) => None,
            FileOutcome::Rejected(err) => Some(err.to_string()),
            FileOutcome::Failed(err) => Some(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files found after expanding folders.
    pub discovered: usize,
    /// Ids of committed records, in commit order.
    pub accepted: Vec<RecordId>,
    /// Validation rejections by class, duplicates excluded.
    pub rejected: BTreeMap<RejectClass, usize>,
    pub duplicates: usize,
    pub timed_out: usize,
    pub read_failures: usize,
    /// Folders that could not be listed.
    pub discovery_errors: Vec<String>,
    /// Files never processed because the batch was cancelled.
    pub skipped: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
    pub reports: Vec<FileReport>,
}

impl BatchSummary {
    pub(crate) fn record(&mut self, report: FileReport) {
        match &report.outcome {
            Some(FileOutcome::Accepted(id)) => self.accepted.push(*id),
            Some(FileOutcome::Rejected(err)) => match RejectClass::from(err) {
                RejectClass::Duplicate => self.duplicates += 1,
                class => *self.rejected.entry(class).or_insert(0) += 1,
            },
            Some(FileOutcome::Failed(ReadFailure::Timeout(_))) => self.timed_out += 1,
            Some(FileOutcome::Failed(_)) => self.read_failures += 1,
            None => {}
        }
        self.reports.push(report);
    }

    pub(crate) fn record_discovery_error(&mut self, err: &DeckError) {
        self.discovery_errors.push(err.to_string());
    }

    #[must_use]
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    #[must_use]
    pub fn rejected_count(&self) -> usize {
        self.rejected.values().sum()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.timed_out + self.read_failures + self.discovery_errors.len()
    }

    /// Reports for files that did not make it into the store.
    pub fn problems(&self) -> impl Iterator<Item = &FileReport> {
        self.reports
            .iter()
            .filter(|r| !matches!(r.outcome, Some(FileOutcome::Accepted(_))))
    }

    /// One-line, user-facing description of the batch.
    #[must_use]
    pub fn message(&self) -> String {
        if self.discovered == 0 && self.discovery_errors.is_empty() {
            return "No files to add".to_string();
        }

        let mut msg = format!("Added {}", plural(self.accepted_count(), "file"));

        if self.duplicates > 0 {
            let _ = write!(msg, ", skipped {}", plural(self.duplicates, "duplicate"));
        }

        let rejected = self.rejected_count();
        if rejected > 0 {
            let parts: Vec<String> = self
                .rejected
                .iter()
                .map(|(class, n)| format!("{n} {}", class.label()))
                .collect();
            let _ = write!(msg, ", rejected {rejected} ({})", parts.join(", "));
        }

        let failed = self.failed_count();
        if failed > 0 {
            let _ = write!(msg, ", {failed} failed to read");
            if self.timed_out > 0 {
                let _ = write!(msg, " ({} timed out)", self.timed_out);
            }
        }

        if self.cancelled {
            let _ = write!(msg, ", cancelled with {} remaining", self.skipped);
        }

        let _ = write!(msg, " in {:.1?}", self.elapsed);
        msg
    }

    #[must_use]
    pub fn severity(&self) -> NotificationLevel {
        let problems = self.rejected_count() + self.failed_count();
        let accepted = self.accepted_count();

        if problems > 0 && accepted == 0 {
            NotificationLevel::Error
        } else if problems > 0 || self.cancelled || self.duplicates > 0 {
            NotificationLevel::Warning
        } else if accepted > 0 {
            NotificationLevel::Success
        } else {
            NotificationLevel::Info
        }
    }
}

/// `"1 file"`, `"3 files"`.
pub(crate) fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(path: &str, outcome: FileOutcome) -> FileReport {
        FileReport::new(path).finish(outcome)
    }

    #[test]
    fn test_duplicates_tallied_separately() {
        let mut summary = BatchSummary {
            discovered: 4,
            ..Default::default()
        };
        summary.record(report("a", FileOutcome::Accepted(RecordId::new(1))));
        summary.record(report(
            "b",
            FileOutcome::Rejected(ValidationError::Duplicate { name: "b".into() }),
        ));
        summary.record(report(
            "c",
            FileOutcome::Rejected(ValidationError::TooLarge { size: 10, max: 5 }),
        ));
        summary.record(report(
            "d",
            FileOutcome::Failed(ReadFailure::Timeout(Duration::from_secs(30))),
        ));

        assert_eq!(summary.accepted_count(), 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.rejected.get(&RejectClass::TooLarge), Some(&1));
        assert_eq!(summary.rejected.get(&RejectClass::Duplicate), None);
        assert_eq!(summary.timed_out, 1);
        assert_eq!(summary.problems().count(), 3);
        assert_eq!(summary.severity(), NotificationLevel::Warning);

        let msg = summary.message();
        assert!(msg.starts_with("Added 1 file, skipped 1 duplicate, rejected 1 (1 too large)"));
        assert!(msg.contains("1 failed to read (1 timed out)"));
    }

    #[test]
    fn test_stage_follows_outcome() {
        let accepted = report("a", FileOutcome::Accepted(RecordId::new(1)));
        assert_eq!(accepted.stage, IngestStage::Materialized);
        assert!(accepted.stage.is_terminal());
        assert_eq!(accepted.reason(), None);

        let rejected = report("b", FileOutcome::Rejected(ValidationError::EmptyFile));
        assert_eq!(rejected.stage, IngestStage::Rejected);
        assert_eq!(rejected.reason().as_deref(), Some("file is empty"));
    }

    #[test]
    fn test_severity_levels() {
        assert_eq!(BatchSummary::default().severity(), NotificationLevel::Info);
        assert_eq!(BatchSummary::default().message(), "No files to add");

        let mut all_bad = BatchSummary {
            discovered: 1,
            ..Default::default()
        };
        all_bad.record(report("x", FileOutcome::Failed(ReadFailure::Aborted)));
        assert_eq!(all_bad.severity(), NotificationLevel::Error);

        let mut ok = BatchSummary {
            discovered: 1,
            ..Default::default()
        };
        ok.record(report("y", FileOutcome::Accepted(RecordId::new(3))));
        assert_eq!(ok.severity(), NotificationLevel::Success);
    }
}
