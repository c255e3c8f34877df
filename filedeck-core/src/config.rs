//! src/config.rs
//! ============================================================================
//! # Config: Application Configuration Loader and Saver
//!
//! Manages all user-editable settings for the file deck. Loads and saves
//! settings as TOML from the platform config path using the
//! [`directories`](https://docs.rs/directories) crate.
//!
//! ## Example
//! ```rust,ignore
//! let config = Config::load().await?;
//! config.save().await?;
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clipr::ClipboardConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tokio::fs as TokioFs;
use tracing::info;

use crate::error::{DeckError, DeckResult};
use crate::model::media::extension_of;

const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "filedeck";
const APPLICATION: &str = "FileDeck";

/// App theme (color scheme) selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,

    Dark,
}

impl Theme {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

/// How the record list is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,

    Grid,

    Tree,
}

impl ViewMode {
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::List => Self::Grid,
            Self::Grid => Self::Tree,
            Self::Tree => Self::List,
        }
    }
}

/// Ingestion limits and type lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Largest accepted file, in bytes
    pub max_file_size: u64,

    /// Hard timeout for reading one file
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,

    /// Two files whose modification times differ by at most this much are
    /// considered the same file (given equal name and size)
    #[serde(with = "humantime_serde")]
    pub duplicate_tolerance: Duration,

    /// Accepted MIME types; `type/*` matches a whole family
    pub allowed_mime_types: Vec<String>,

    /// MIME types read as opaque bytes
    pub binary_mime_types: Vec<String>,

    /// Non-`text/*` MIME types whose content is text
    pub textual_mime_types: Vec<String>,

    /// Extensions accepted as text regardless of declared type
    pub textual_extensions: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let owned =
            |items: &[&str]| -> Vec<String> { items.iter().map(|s| (*s).to_string()).collect() };

        Self {
            max_file_size: 50 * 1024 * 1024,
            read_timeout: Duration::from_secs(30),
            duplicate_tolerance: Duration::from_secs(1),
            allowed_mime_types: owned(&[
                "text/*",
                "image/*",
                "video/*",
                "audio/*",
                "application/json",
                "application/xml",
                "application/javascript",
                "application/x-sh",
                "application/x-yaml",
                "application/toml",
                "application/sql",
                "application/pdf",
                "application/zip",
                "application/gzip",
                "application/octet-stream",
            ]),
            binary_mime_types: owned(&[
                "application/pdf",
                "application/zip",
                "application/gzip",
                "application/octet-stream",
            ]),
            textual_mime_types: owned(&[
                "application/json",
                "application/xml",
                "application/javascript",
                "application/x-sh",
                "application/x-yaml",
                "application/toml",
                "application/sql",
            ]),
            textual_extensions: owned(&[
                "txt", "md", "markdown", "rst", "log", "csv", "tsv", "json", "jsonl", "xml",
                "yaml", "yml", "toml", "ini", "cfg", "conf", "env", "html", "htm", "css", "scss",
                "js", "mjs", "ts", "tsx", "jsx", "vue", "svelte", "rs", "go", "py", "rb", "php",
                "java", "kt", "swift", "c", "h", "cpp", "hpp", "cc", "cs", "sh", "bash", "zsh",
                "fish", "ps1", "bat", "sql", "graphql", "proto", "lua", "pl", "r", "dart",
                "scala", "ex", "exs", "erl", "hs", "clj", "tex", "svg", "gitignore",
                "dockerfile", "makefile", "lock",
            ]),
        }
    }
}

impl IngestConfig {
    /// True if `mime` is on the allow-list or the name has a textual extension.
    #[must_use]
    pub fn is_allowed(&self, mime: &str, name: &str) -> bool {
        let mime = mime.trim().to_ascii_lowercase();

        let mime_allowed = !mime.is_empty()
            && self.allowed_mime_types.iter().any(|pattern| {
                match pattern.strip_suffix("/*") {
                    Some(family) => mime
                        .split_once('/')
                        .is_some_and(|(head, _)| head == family),
                    None => pattern == &mime,
                }
            });

        mime_allowed || extension_of(name).is_some_and(|ext| self.is_textual_extension(&ext))
    }

    #[must_use]
    pub fn is_textual_mime(&self, mime: &str) -> bool {
        self.textual_mime_types.iter().any(|m| m == mime)
    }

    #[must_use]
    pub fn is_textual_extension(&self, ext: &str) -> bool {
        self.textual_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// Presentation defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub default_mode: ViewMode,

    /// Build the tree from full relative paths instead of bare names
    pub tree_uses_relative_paths: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_mode: ViewMode::List,
            tree_uses_relative_paths: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// How long a notification stays visible
    #[serde(with = "humantime_serde")]
    pub default_duration: Duration,

    /// Entries kept in the persisted recent-errors log
    pub error_log_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            default_duration: Duration::from_secs(3),
            error_log_capacity: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,

    /// Directory for rolling log files; `None` logs to stderr only
    pub log_dir: Option<PathBuf>,

    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: Some(PathBuf::from("logs")),
            file_prefix: "filedeck".to_string(),
        }
    }
}

/// Main configuration struct for the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub theme: Theme,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub view: ViewConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub clipboard: ClipboardConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Loads config from the platform config dir, or writes and returns defaults.
    ///
    /// The config is expected at `$XDG_CONFIG_HOME/FileDeck/config.toml`
    /// (Linux), or equivalent on Windows/macOS.
    pub async fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;
        if TokioFs::try_exists(&path).await? {
            info!("Loading config from {}", path.display());
            Ok(Self::load_from(&path).await?)
        } else {
            info!(
                "No config file found at {}, using default configuration. Creating it now.",
                path.display()
            );

            let default_config = Self::default();
            default_config.save_to(&path).await?;

            Ok(default_config)
        }
    }

    pub async fn load_from(path: &Path) -> DeckResult<Self> {
        let text = TokioFs::read_to_string(path).await?;
        let cfg: Self = toml::from_str(&text)?;
        cfg.clipboard
            .validate()
            .map_err(DeckError::Clipboard)?;
        Ok(cfg)
    }

    pub async fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path).await?;
        Ok(())
    }

    pub async fn save_to(&self, path: &Path) -> DeckResult<()> {
        info!("Saving config to {}", path.display());

        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        TokioFs::write(path, toml_str).await?;

        Ok(())
    }

    /// Returns the canonical config file path using `directories::ProjectDirs`.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let proj_dirs = ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory."))?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_allow_list_wildcards_and_extensions() {
        let ingest = IngestConfig::default();
        assert!(ingest.is_allowed("image/webp", "pic.webp"));
        assert!(ingest.is_allowed("application/json", "data"));
        assert!(ingest.is_allowed("", "main.rs"));
        assert!(ingest.is_allowed("application/x-unknown", "notes.md"));
        assert!(!ingest.is_allowed("application/x-msdownload", "setup.exe"));
        assert!(!ingest.is_allowed("", "no_extension"));
    }

    #[test]
    fn test_view_mode_cycles() {
        assert_eq!(ViewMode::List.next(), ViewMode::Grid);
        assert_eq!(ViewMode::Grid.next(), ViewMode::Tree);
        assert_eq!(ViewMode::Tree.next(), ViewMode::List);
    }

    #[test]
    fn test_theme_parse_and_toggle() {
        assert_eq!(Theme::parse(" Dark "), Some(Theme::Dark));
        assert_eq!(Theme::parse("solarized"), None);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip_with_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.theme = Theme::Dark;
        config.ingest.read_timeout = Duration::from_secs(5);
        config.save_to(&path).await.unwrap();

        let loaded = Config::load_from(&path).await.unwrap();
        assert_eq!(loaded, config);

        let partial = dir.path().join("partial.toml");
        TokioFs::write(&partial, "theme = \"dark\"\n[ingest]\nmax_file_size = 10\n")
            .await
            .unwrap();
        let loaded = Config::load_from(&partial).await.unwrap();
        assert_eq!(loaded.theme, Theme::Dark);
        assert_eq!(loaded.ingest.max_file_size, 10);
        assert_eq!(loaded.ingest.read_timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_invalid_toml_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        TokioFs::write(&path, "theme = [").await.unwrap();

        assert!(matches!(
            Config::load_from(&path).await,
            Err(DeckError::Config(_))
        ));
    }
}
