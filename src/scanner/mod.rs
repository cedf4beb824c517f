//! Directory scanning and content hashing.
//!
//! Two sequential phases of one job, both writing to the
//! [`InventoryStore`](crate::inventory::InventoryStore):
//!
//! - [`walker`]: traverses the root tree and upserts one record per file
//! - [`hasher`]: streams size-colliding files through BLAKE3 and persists
//!   the digests
//!
//! The hasher never runs against a tree the walker of the same job has not
//! finished; the [`JobCoordinator`](crate::job::JobCoordinator) enforces the
//! ordering.

pub mod hasher;
pub mod walker;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use hasher::Hasher;
pub use walker::Walker;

/// Directory and file names the walker never descends into or records.
/// Dotfiles and dot-directories are excluded by prefix in addition.
pub const EXCLUDED_NAMES: &[&str] = &[
    "node_modules",
    "$RECYCLE.BIN",
    "System Volume Information",
    "#recycle",
    "@eaDir",
    "lost+found",
];

/// Whether a directory entry name is excluded from scanning.
#[must_use]
pub fn is_excluded_name(name: &str) -> bool {
    name.starts_with('.') || EXCLUDED_NAMES.contains(&name)
}

/// Observer for per-file progress during a walk or hash pass.
///
/// Implemented by the job coordinator to keep its progress snapshot current.
/// Called between blocking file operations; implementations must not block.
pub trait ScanObserver: Send + Sync {
    /// A file was processed; `name` is its base name.
    fn on_file(&self, name: &str);
}

/// Observer that ignores all events.
pub struct NullObserver;

impl ScanObserver for NullObserver {
    fn on_file(&self, _name: &str) {}
}

/// Check a cancellation flag, if one was provided.
pub(crate) fn is_cancelled(flag: Option<&Arc<AtomicBool>>) -> bool {
    flag.is_some_and(|f| f.load(Ordering::SeqCst))
}

/// Errors that can abort a walk phase.
///
/// Per-entry I/O failures never surface here; they are logged and skipped.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The scan root (or requested subpath) is not a readable directory.
    #[error("not a scannable directory: {0}")]
    NotADirectory(PathBuf),

    /// The cancellation flag was set mid-walk.
    #[error("scan cancelled")]
    Cancelled,

    /// Writing to the inventory failed.
    #[error(transparent)]
    Inventory(#[from] crate::inventory::InventoryError),
}

/// Errors that can abort a hashing pass.
///
/// Per-file read failures never surface here; they are logged, the record's
/// digest stays absent, and the next pass retries it.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The cancellation flag was set mid-pass.
    #[error("hashing cancelled")]
    Cancelled,

    /// Reading from or writing to the inventory failed.
    #[error(transparent)]
    Inventory(#[from] crate::inventory::InventoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excluded_names_cover_dotfiles_and_system_dirs() {
        assert!(is_excluded_name(".git"));
        assert!(is_excluded_name(".hidden"));
        assert!(is_excluded_name("node_modules"));
        assert!(is_excluded_name("$RECYCLE.BIN"));
        assert!(is_excluded_name("System Volume Information"));
        assert!(is_excluded_name("@eaDir"));
    }

    #[test]
    fn regular_names_are_not_excluded() {
        assert!(!is_excluded_name("photos"));
        assert!(!is_excluded_name("movie.mkv"));
        assert!(!is_excluded_name("recycle"));
    }
}
