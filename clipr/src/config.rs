use crate::error::{ClipError, ClipResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Maximum number of items kept in history
    pub max_items: usize,

    /// Auto-expire items after duration (None = never expire)
    #[serde(default, with = "humantime_serde")]
    pub item_expiry: Option<Duration>,

    /// Largest single text accepted, in bytes
    pub max_item_bytes: usize,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            max_items: 20,
            item_expiry: Some(Duration::from_secs(3600)), // 1 hour
            max_item_bytes: 64 * 1024 * 1024,
        }
    }
}

impl ClipboardConfig {
    pub fn validate(&self) -> ClipResult<()> {
        if self.max_items == 0 {
            return Err(ClipError::ConfigError("max_items must be at least 1".into()));
        }
        if self.max_item_bytes == 0 {
            return Err(ClipError::ConfigError(
                "max_item_bytes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
