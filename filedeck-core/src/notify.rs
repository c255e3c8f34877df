//! Notification collaborator: fire-and-forget user messages.

use std::sync::Arc;
use std::time::{Duration, Instant};

use compact_str::CompactString;
use parking_lot::Mutex;
use tracing::{error, info, warn};

/// Notification levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum NotificationLevel {
    Info = 0,
    Success = 1,
    Warning = 2,
    Error = 3,
}

/// Compact notification with timestamp
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: CompactString,
    pub level: NotificationLevel,
    pub timestamp: Instant,
    pub duration: Option<Duration>,
}

impl Notification {
    pub fn new(message: impl Into<CompactString>, level: NotificationLevel) -> Self {
        Self {
            message: message.into(),
            level,
            timestamp: Instant::now(),
            duration: None,
        }
    }

    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// True once the display duration has elapsed. Sticky notifications never expire.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.duration
            .is_some_and(|d| self.timestamp.elapsed() >= d)
    }
}

/// Receives notifications; nothing is ever acknowledged back to the core.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Info | NotificationLevel::Success => {
                info!(marker = "NOTIFY", "{}", notification.message);
            }
            NotificationLevel::Warning => warn!(marker = "NOTIFY", "{}", notification.message),
            NotificationLevel::Error => error!(marker = "NOTIFY", "{}", notification.message),
        }
    }
}

/// Keeps every notification in memory, e.g. for a toast stack or tests.
#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    entries: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Notification> {
        self.entries.lock().clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<Notification> {
        self.entries.lock().last().cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop expired notifications, returning how many were removed.
    pub fn prune_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|n| !n.is_expired());
        before - entries.len()
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) {
        self.entries.lock().push(notification);
    }
}
