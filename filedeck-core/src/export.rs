//! ``src/export.rs``
//! ============================================================================
//! # Plain-text exports for the clipboard
//!
//! Single file content, combined listings, and a POSIX shell script that
//! recreates the records as files. The clipboard itself sits behind
//! [`ClipboardSink`] and has no effect on deck state.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use base64::{Engine, engine::general_purpose::STANDARD};
use clipr::{ClipBoard, ClipKind};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{DeckError, DeckResult};
use crate::model::{
    media::Content,
    record::{FileRecord, split_segments},
};
use crate::tree::projector::{ConflictKind, TreeConflict};

const HEREDOC_BASE: &str = "FILEDECK_EOF";
const BASE64_LINE: usize = 76;

/// Receives exported text.
pub trait ClipboardSink: Send + Sync {
    fn copy_text(&self, kind: ClipKind, label: &str, text: String) -> DeckResult<()>;
}

impl ClipboardSink for Mutex<ClipBoard> {
    fn copy_text(&self, kind: ClipKind, label: &str, text: String) -> DeckResult<()> {
        self.lock().copy_text(kind, label, text)?;
        Ok(())
    }
}

/// Text content of a record; opaque content cannot be exported as text.
pub fn content_text(record: &FileRecord) -> DeckResult<&str> {
    record.text().ok_or(DeckError::NotEditable {
        id: record.id,
        media: record.media_type,
    })
}

/// Every record under a `=== path ===` header. Opaque records list their
/// type and size instead of content.
#[must_use]
pub fn combined_text<'a>(records: impl IntoIterator<Item = &'a FileRecord>) -> String {
    let mut out = String::new();
    for record in records {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "=== {} ===", record.relative_path);
        match record.text() {
            Some(text) => {
                out.push_str(text);
                if !text.ends_with('\n') {
                    out.push('\n');
                }
            }
            None => {
                let _ = writeln!(out, "[{} content, {}]", record.media_type, record.size_human());
            }
        }
    }
    out
}

/// Quote `s` for a POSIX shell.
#[must_use]
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Path used in the script: empty, `.` and `..` segments are dropped.
fn script_path(record: &FileRecord) -> String {
    let path: Vec<&str> = split_segments(&record.relative_path)
        .into_iter()
        .filter(|s| *s != "." && *s != "..")
        .collect();
    if path.is_empty() {
        record.name.to_string()
    } else {
        path.join("/")
    }
}

/// Heredoc delimiter that no line of `body` equals.
fn delimiter(body: &str, seq: usize) -> String {
    let mut delim = format!("{HEREDOC_BASE}_{seq}");
    while body.lines().any(|line| line == delim) {
        delim.push('_');
    }
    delim
}

fn wrap_base64(payload: &str) -> String {
    let mut out = String::with_capacity(payload.len() + payload.len() / BASE64_LINE + 1);
    for chunk in payload.as_bytes().chunks(BASE64_LINE) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push('\n');
    }
    out
}

/// Base64 payload of opaque content.
fn opaque_payload(content: &Content) -> Option<String> {
    match content {
        Content::Text(_) => None,
        Content::Encoded(uri) => Some(
            uri.split_once(";base64,")
                .map_or_else(|| STANDARD.encode(uri), |(_, data)| data.to_string()),
        ),
        Content::Bytes(bytes) => Some(STANDARD.encode(bytes)),
    }
}

/// Generated script plus the records it leaves out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellScript {
    pub text: String,
    /// Records whose path clashes with an earlier record's file or directory.
    pub conflicts: Vec<TreeConflict>,
}

/// File and directory paths already written by the script.
#[derive(Default)]
struct PathClaims {
    files: BTreeSet<String>,
    dirs: BTreeSet<String>,
}

impl PathClaims {
    /// Claim `path` for a file, or report where it clashes.
    fn claim(&mut self, path: &str) -> Result<(), (String, ConflictKind)> {
        let ancestors: Vec<&str> = path.match_indices('/').map(|(i, _)| &path[..i]).collect();

        if let Some(file) = ancestors.iter().find(|dir| self.files.contains(**dir)) {
            return Err(((*file).to_string(), ConflictKind::FileExists));
        }
        if self.files.contains(path) {
            return Err((path.to_string(), ConflictKind::FileExists));
        }
        if self.dirs.contains(path) {
            return Err((path.to_string(), ConflictKind::DirectoryExists));
        }

        self.dirs.extend(ancestors.into_iter().map(str::to_string));
        self.files.insert(path.to_string());
        Ok(())
    }
}

/// A `#!/bin/sh` script that recreates `records` below the working directory.
///
/// Text goes through quoted heredocs (no expansion); opaque content is piped
/// through `base64 -d`. A record whose path is already taken by an earlier
/// file, or that needs a directory where a file was written, is left out and
/// reported in [`ShellScript::conflicts`].
#[must_use]
pub fn shell_script<'a>(records: impl IntoIterator<Item = &'a FileRecord>) -> ShellScript {
    let mut claims = PathClaims::default();
    let mut conflicts = Vec::new();
    let mut accepted: Vec<(&FileRecord, String)> = Vec::new();

    for record in records {
        let path = script_path(record);
        match claims.claim(&path) {
            Ok(()) => accepted.push((record, path)),
            Err((at, kind)) => {
                warn!(id = %record.id, path = %path, at = %at, "Record left out of shell script");
                conflicts.push(TreeConflict {
                    record_id: record.id,
                    path: path.into(),
                    at: at.into(),
                    kind,
                });
            }
        }
    }

    let mut out = String::from("#!/bin/sh\n");
    let _ = writeln!(out, "# Recreates {} file(s)", accepted.len());
    for conflict in &conflicts {
        let _ = writeln!(out, "# Skipped {}: clashes at {}", conflict.path, conflict.at);
    }
    out.push_str("set -e\n\n");

    for dir in &claims.dirs {
        let _ = writeln!(out, "mkdir -p {}", shell_quote(dir));
    }
    if !claims.dirs.is_empty() {
        out.push('\n');
    }

    for (seq, (record, path)) in accepted.iter().enumerate() {
        let target = shell_quote(path);
        match opaque_payload(&record.content) {
            Some(payload) => {
                let body = wrap_base64(&payload);
                let delim = delimiter(&body, seq + 1);
                let _ = write!(out, "base64 -d > {target} <<'{delim}'\n{body}{delim}\n");
            }
            None => {
                let text = record.content.as_text().unwrap_or_default();
                let delim = delimiter(text, seq + 1);
                if text.is_empty() {
                    let _ = writeln!(out, ": > {target}");
                } else if text.ends_with('\n') {
                    let _ = write!(out, "cat > {target} <<'{delim}'\n{text}{delim}\n");
                } else {
                    // command substitution strips the newline the heredoc adds
                    let _ = write!(
                        out,
                        "printf '%s' \"$(cat <<'{delim}'\n{text}\n{delim}\n)\" > {target}\n"
                    );
                }
            }
        }
    }

    debug!(
        files = accepted.len(),
        dirs = claims.dirs.len(),
        skipped = conflicts.len(),
        "Shell script generated"
    );
    ShellScript {
        text: out,
        conflicts,
    }
}
