//! Deletion executor: removes a file's bytes and its inventory record
//! together.
//!
//! Ordering is file first, record second: a record must never describe a
//! file whose deletion already succeeded, and a failed unlink must leave the
//! record intact so the inventory never reports a phantom success.
//!
//! The default mode unlinks permanently; trash mode moves the bytes to the
//! system recycle bin instead, which is recoverable but still removes them
//! from the scanned tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::inventory::{InventoryError, InventoryStore};

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// No inventory record exists for the given path identity.
    #[error("no inventory record for '{0}'")]
    RecordNotFound(String),

    /// The underlying file is gone (deleted out of band).
    #[error("file missing on disk: {0}")]
    FileMissing(PathBuf),

    /// Permission denied when unlinking.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Moving the file to the system trash failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed { path: PathBuf, message: String },

    /// Other I/O failure during unlink.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Removing the inventory record failed after the file was unlinked.
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

/// How file bytes are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// `remove_file`: bytes are gone for good.
    #[default]
    Permanent,
    /// Move to the system trash; recoverable by the operator.
    Trash,
}

/// Result of a batch deletion.
///
/// The batch reports success only when every item succeeded; individual
/// failures never stop the remaining items.
#[derive(Debug, Clone, Default)]
pub struct BatchDeleteResult {
    /// Paths successfully deleted (record and bytes).
    pub deleted: Vec<String>,
    /// Per-item failures: `(path identity, error message)`.
    pub failures: Vec<(String, String)>,
    /// Total bytes freed by successful deletions.
    pub bytes_freed: u64,
}

impl BatchDeleteResult {
    /// Number of successful deletions.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    /// Check if every item succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.all_succeeded() {
            format!(
                "Deleted {} file(s), freed {} bytes",
                self.deleted_count(),
                self.bytes_freed
            )
        } else {
            format!(
                "Deleted {} file(s), {} failed, freed {} bytes",
                self.deleted_count(),
                self.failures.len(),
                self.bytes_freed
            )
        }
    }
}

/// Executes single and batch deletions against one root and store.
pub struct DeletionExecutor<'a> {
    root: &'a Path,
    store: &'a InventoryStore,
    mode: DeleteMode,
}

impl<'a> DeletionExecutor<'a> {
    /// Create an executor resolving record paths under `root`.
    #[must_use]
    pub fn new(root: &'a Path, store: &'a InventoryStore) -> Self {
        Self {
            root,
            store,
            mode: DeleteMode::default(),
        }
    }

    /// Set the deletion mode.
    #[must_use]
    pub fn with_mode(mut self, mode: DeleteMode) -> Self {
        self.mode = mode;
        self
    }

    /// Delete one file by its record identity (normalized relative path).
    ///
    /// Looks up the record first; a missing record fails without touching
    /// the filesystem. A failed unlink fails without touching the record.
    /// Returns the freed size in bytes.
    pub fn delete_one(&self, path: &str) -> Result<u64, DeleteError> {
        let Some(record) = self.store.get(path)? else {
            return Err(DeleteError::RecordNotFound(path.to_string()));
        };

        let absolute = record.absolute_path(self.root);
        unlink(&absolute, self.mode)?;
        self.store.delete(path)?;

        log::info!("Deleted {} ({} bytes)", path, record.size);
        Ok(record.size)
    }

    /// Delete a batch of files, independently per item.
    ///
    /// Failures are collected by identity and never stop the remaining
    /// items.
    pub fn delete_batch(&self, paths: &[String]) -> BatchDeleteResult {
        let mut result = BatchDeleteResult::default();
        for path in paths {
            match self.delete_one(path) {
                Ok(size) => {
                    result.bytes_freed += size;
                    result.deleted.push(path.clone());
                }
                Err(e) => {
                    log::warn!("Failed to delete {}: {}", path, e);
                    result.failures.push((path.clone(), e.to_string()));
                }
            }
        }
        log::info!("{}", result.summary());
        result
    }
}

fn unlink(path: &Path, mode: DeleteMode) -> Result<(), DeleteError> {
    match mode {
        DeleteMode::Permanent => fs::remove_file(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DeleteError::FileMissing(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => DeleteError::PermissionDenied(path.to_path_buf()),
            _ => DeleteError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }),
        DeleteMode::Trash => {
            // trash reports a missing file as a generic error; stat first so
            // the caller sees the same taxonomy as permanent mode.
            if !path.exists() {
                return Err(DeleteError::FileMissing(path.to_path_buf()));
            }
            trash::delete(path).map_err(|e| DeleteError::TrashFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    }
}
