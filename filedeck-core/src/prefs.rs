//! ``src/prefs.rs``
//! ============================================================================
//! # Persisted preferences
//!
//! Only two artifacts outlive a session: the theme name and a bounded log of
//! recent error messages. Both live under fixed keys in a small string store.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Theme;
use crate::error::{DeckError, DeckResult};

pub const THEME_KEY: &str = "filedeck.theme";
pub const RECENT_ERRORS_KEY: &str = "filedeck.recent_errors";
pub const DEFAULT_ERROR_CAPACITY: usize = 10;

/// Key/value backend for preferences.
pub trait PreferenceStore: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> DeckResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> DeckResult<()>;

    fn remove(&self, key: &str) -> DeckResult<()>;
}

/// Preferences kept for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryPreferences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> DeckResult<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> DeckResult<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> DeckResult<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

/// Preferences in a TOML table on disk, rewritten on every change.
#[derive(Debug)]
pub struct TomlPreferences {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl TomlPreferences {
    /// Open (or start) the preferences file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> DeckResult<Self> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), entries = values.len(), "Preferences opened");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// `preferences.toml` in the platform data directory.
    pub fn open_default() -> DeckResult<Self> {
        let dirs = ProjectDirs::from("org", "filedeck", "FileDeck").ok_or_else(|| {
            DeckError::Preferences("could not determine data directory".to_string())
        })?;
        Self::open(dirs.data_dir().join("preferences.toml"))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> DeckResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, toml::to_string(values)?)?;
        Ok(())
    }
}

impl PreferenceStore for TomlPreferences {
    fn get(&self, key: &str) -> DeckResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> DeckResult<()> {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> DeckResult<()> {
        let mut values = self.values.lock();
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentError {
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Typed access to the fixed preference keys.
#[derive(Debug, Clone)]
pub struct Preferences {
    store: Arc<dyn PreferenceStore>,
    error_capacity: usize,
}

impl Preferences {
    pub fn new(store: Arc<dyn PreferenceStore>, error_capacity: usize) -> Self {
        Self {
            store,
            error_capacity,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPreferences::new()), DEFAULT_ERROR_CAPACITY)
    }

    /// Stored theme; unknown values read as unset.
    pub fn theme(&self) -> DeckResult<Option<Theme>> {
        Ok(self
            .store
            .get(THEME_KEY)?
            .and_then(|value| Theme::parse(&value)))
    }

    pub fn set_theme(&self, theme: Theme) -> DeckResult<()> {
        self.store.set(THEME_KEY, theme.as_str())
    }

    /// Logged errors, oldest first. A corrupt entry reads as an empty log.
    pub fn recent_errors(&self) -> DeckResult<Vec<RecentError>> {
        let Some(raw) = self.store.get(RECENT_ERRORS_KEY)? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Discarding unreadable recent-errors log");
            Vec::new()
        }))
    }

    /// Append an error, keeping only the newest `error_capacity` entries.
    pub fn push_error(&self, message: impl Into<String>) -> DeckResult<()> {
        let mut errors = self.recent_errors()?;
        errors.push(RecentError {
            message: message.into(),
            at: Utc::now(),
        });
        let excess = errors.len().saturating_sub(self.error_capacity);
        errors.drain(..excess);
        self.store
            .set(RECENT_ERRORS_KEY, &serde_json::to_string(&errors)?)
    }

    pub fn clear_errors(&self) -> DeckResult<()> {
        self.store.remove(RECENT_ERRORS_KEY)
    }
}
