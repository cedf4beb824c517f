//! Directory walker: traversal plus inventory upserts.
//!
//! Uses `walkdir`, which iterates with an explicit internal stack, so deep
//! trees cannot blow the call stack. The walk is single-threaded within a
//! job; upserts land in the store one path at a time, which keeps them
//! linearizable per path.
//!
//! The walker only adds and refreshes records. Paths that vanished from disk
//! outside the [`DeletionExecutor`](crate::actions::DeletionExecutor) keep
//! their rows until deleted explicitly — a documented limitation.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use super::{is_cancelled, is_excluded_name, NullObserver, ScanError, ScanObserver};
use crate::inventory::{normalize_rel_path, InventoryStore};

/// Recursive directory walker feeding the inventory store.
pub struct Walker<'a> {
    root: &'a Path,
    store: &'a InventoryStore,
    cancel: Option<Arc<AtomicBool>>,
    observer: &'a dyn ScanObserver,
}

impl<'a> Walker<'a> {
    /// Create a walker over `root` writing into `store`.
    #[must_use]
    pub fn new(root: &'a Path, store: &'a InventoryStore) -> Self {
        Self {
            root,
            store,
            cancel: None,
            observer: &NullObserver,
        }
    }

    /// Set a cancellation flag checked between directory entries.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Set a progress observer notified per upserted file.
    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn ScanObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Walk the whole tree under the root.
    ///
    /// Returns the count of files successfully upserted.
    pub fn walk(&self) -> Result<u64, ScanError> {
        self.walk_subpath(Path::new(""))
    }

    /// Walk the tree under `root/subpath`. Record keys stay relative to the
    /// root regardless of the starting point.
    ///
    /// Entries that fail to read or stat are logged and skipped; the walk
    /// never aborts for one bad entry. Traversal order carries no meaning —
    /// re-running over an unchanged tree is a no-op with respect to digests.
    pub fn walk_subpath(&self, subpath: &Path) -> Result<u64, ScanError> {
        let start: PathBuf = self.root.join(subpath);
        if !start.is_dir() {
            return Err(ScanError::NotADirectory(start));
        }

        let mut upserted = 0u64;
        let entries = WalkDir::new(&start)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || !is_excluded_name(&e.file_name().to_string_lossy())
            });

        for entry in entries {
            if is_cancelled(self.cancel.as_ref()) {
                log::info!("Walk cancelled after {} files", upserted);
                return Err(ScanError::Cancelled);
            }

            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            // Regular files only; symlinks are not followed and not recorded.
            if !entry.file_type().is_file() {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            let Ok(rel) = entry.path().strip_prefix(self.root) else {
                log::warn!("Entry outside scan root: {}", entry.path().display());
                continue;
            };
            let path_key = normalize_rel_path(rel);
            let name = entry.file_name().to_string_lossy().into_owned();
            let mtime: DateTime<Utc> = metadata
                .modified()
                .unwrap_or(SystemTime::UNIX_EPOCH)
                .into();

            self.store.upsert(&path_key, &name, metadata.len(), mtime)?;
            upserted += 1;
            self.observer.on_file(&name);
            log::trace!("Upserted {} ({} bytes)", path_key, metadata.len());
        }

        log::debug!(
            "Walk of {} complete: {} files upserted",
            start.display(),
            upserted
        );
        Ok(upserted)
    }
}
