//! ``src/ingest/discover.rs``
//!
//! # Discovery: flatten dropped folders into files
//!
//! Expands directory entries depth-first into a single stream of `RawFile`s,
//! each carrying the accumulated folder prefix in its `relative_path`.
//! Directory listing failures are yielded as errors and traversal continues
//! with the next entry.

use compact_str::CompactString;
use futures::{Stream, stream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{DeckError, DeckResult, ReadFailure};
use crate::ingest::source::{HostEntry, RawFile};

struct Pending {
    entry: HostEntry,
    /// Folder path accumulated so far, `None` at the top level.
    prefix: Option<CompactString>,
}

struct DiscoveryState {
    stack: Vec<Pending>,
    cancel: CancellationToken,
}

fn join(prefix: Option<&str>, name: &str) -> CompactString {
    match prefix {
        Some(prefix) => {
            let mut path = CompactString::from(prefix);
            path.push('/');
            path.push_str(name);
            path
        }
        None => CompactString::from(name),
    }
}

/// Discover every file reachable from `entries`, in drop order.
///
/// Stops early (without error) once `cancel` fires.
pub fn discover(
    entries: Vec<HostEntry>,
    cancel: CancellationToken,
) -> impl Stream<Item = DeckResult<RawFile>> + Send {
    let stack = entries
        .into_iter()
        .rev()
        .map(|entry| Pending {
            entry,
            prefix: None,
        })
        .collect();

    stream::unfold(DiscoveryState { stack, cancel }, |mut state| async move {
        loop {
            if state.cancel.is_cancelled() {
                debug!("Discovery cancelled");
                return None;
            }

            let Pending { entry, prefix } = state.stack.pop()?;

            match entry {
                HostEntry::File(mut file) => {
                    if let Some(prefix) = prefix.as_deref() {
                        file.relative_path = join(Some(prefix), &file.name);
                    } else if file.relative_path.is_empty() {
                        file.relative_path = file.name.clone();
                    }
                    return Some((Ok(file), state));
                }

                HostEntry::Directory(dir) => {
                    let path = join(prefix.as_deref(), dir.name());

                    match dir.entries().await {
                        Ok(children) => {
                            debug!(dir = %path, children = children.len(), "Expanding directory");
                            // reversed so the first child is popped first
                            state.stack.extend(children.into_iter().rev().map(|entry| Pending {
                                entry,
                                prefix: Some(path.clone()),
                            }));
                        }
                        Err(e) => {
                            warn!(dir = %path, error = %e, "Failed to list directory");
                            let err = DeckError::read(path, ReadFailure::Io(e.to_string().into()));
                            return Some((Err(err), state));
                        }
                    }
                }
            }
        }
    })
}
