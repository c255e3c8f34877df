//! # clipr - Text Clipboard for File Decks
//!
//! A bounded, ordered clipboard holding plain-text exports (file contents,
//! combined listings, tree renderings, generated shell scripts).
//!
//! ## Key Features
//! - Newest-first history with a configurable item limit
//! - Optional expiry of stale items
//! - Re-copying identical text refreshes the existing entry instead of duplicating it
//! - Per-item size ceiling

pub mod clipboard;
pub mod config;
pub mod error;
pub mod item;

// Re-export main types for easy use
pub use clipboard::{ClipBoard, ClipboardStats};
pub use config::ClipboardConfig;
pub use error::{ClipError, ClipResult};
pub use item::{ClipItem, ClipKind};
