//! ``src/model/media.rs``
//! ============================================================================
//! # Media classification and record content
//!
//! `MediaType` is the deck's own classification of a file, derived once at
//! ingestion from the declared MIME type and the file extension. It decides
//! how content is read, whether it is searchable, and how it is rendered.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::config::IngestConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Text,
    Html,
    Image,
    Video,
    Audio,
    Binary,
}

impl MediaType {
    pub const ALL: [Self; 6] = [
        Self::Text,
        Self::Html,
        Self::Image,
        Self::Video,
        Self::Audio,
        Self::Binary,
    ];

    /// Textual media are searchable and editable.
    #[inline]
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(self, Self::Text | Self::Html)
    }

    /// Media read as a displayable `data:` URI.
    #[inline]
    #[must_use]
    pub const fn is_displayable(self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Audio)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Html => "html",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Binary => "binary",
        }
    }

    /// Classify a file from its declared MIME type and name.
    ///
    /// The MIME prefix wins for media types; HTML is recognised by MIME or
    /// extension; anything else falls back to the extension lists.
    #[must_use]
    pub fn classify(mime: &str, name: &str, config: &IngestConfig) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        let ext = extension_of(name);

        if mime.starts_with("image/") {
            return Self::Image;
        }
        if mime.starts_with("video/") {
            return Self::Video;
        }
        if mime.starts_with("audio/") {
            return Self::Audio;
        }
        if mime == "text/html" || matches!(ext.as_deref(), Some("html" | "htm")) {
            return Self::Html;
        }
        if config.binary_mime_types.iter().any(|b| b == &mime) {
            return Self::Binary;
        }
        if mime.starts_with("text/") || config.is_textual_mime(&mime) {
            return Self::Text;
        }
        if let Some(ext) = ext.as_deref()
            && config.is_textual_extension(ext)
        {
            return Self::Text;
        }

        Self::Binary
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower-case extension of a file name, if it has one.
#[must_use]
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// In-memory content of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Decoded text; searchable and editable.
    Text(String),
    /// Displayable encoded payload (`data:<mime>;base64,...`).
    Encoded(String),
    /// Opaque bytes.
    Bytes(Bytes),
}

impl Content {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Encoded(_) | Self::Bytes(_) => None,
        }
    }

    /// Length in bytes of the held representation.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) | Self::Encoded(text) => text.len(),
            Self::Bytes(bytes) => bytes.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
