//! Persisted file inventory.
//!
//! The inventory is the single source of truth for everything the engine
//! knows about the scanned tree: one [`FileRecord`] per distinct relative
//! path, keyed by that path. The [`Walker`](crate::scanner::Walker) creates
//! and refreshes records, the [`Hasher`](crate::scanner::Hasher) fills in
//! digests lazily, and the [`DeletionExecutor`](crate::actions::DeletionExecutor)
//! is the only component that removes them.

pub mod store;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use store::InventoryStore;

/// One row of the inventory: metadata for a single scanned file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Root-relative, forward-slash-normalized path. Unique key.
    pub path: String,
    /// Base name, redundant with the last segment of `path`, kept for display.
    pub name: String,
    /// Byte length at the last successful stat.
    pub size: u64,
    /// Last-modified timestamp at the last successful stat.
    pub mtime: DateTime<Utc>,
    /// Content digest (hex BLAKE3). Absent until lazily computed.
    ///
    /// Once set, the digest is trusted as of the scan that computed it:
    /// a size-preserving content change without a rehash goes undetected.
    pub hash: Option<String>,
    /// Timestamp of the last successful stat.
    pub scanned_at: DateTime<Utc>,
}

impl FileRecord {
    /// Resolve this record's absolute path under `root`.
    #[must_use]
    pub fn absolute_path(&self, root: &Path) -> PathBuf {
        root.join(&self.path)
    }
}

/// Normalize a root-relative path into the inventory's key form:
/// forward slashes between components, no leading separator.
#[must_use]
pub fn normalize_rel_path(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Errors from the inventory store.
#[derive(thiserror::Error, Debug)]
pub enum InventoryError {
    /// Underlying SQLite failure.
    #[error("inventory database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Could not create the directory holding the database file.
    #[error("failed to create inventory directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
