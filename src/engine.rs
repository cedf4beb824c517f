//! Engine facade: the operation contract exposed to callers.
//!
//! Outer layers (the CLI here, a browsing/streaming frontend elsewhere)
//! talk to the dedup core exclusively through this surface. Every mutating
//! operation returns a structured outcome object — a failed request is
//! reported, never silently dropped.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::actions::{DeleteMode, DeletionExecutor};
use crate::duplicates::{duplicate_groups, DuplicateGroup};
use crate::inventory::store::ScanStats;
use crate::inventory::{InventoryError, InventoryStore};
use crate::job::{JobCoordinator, ScanProgress};

/// Result of a scan trigger.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub success: bool,
    pub files_counted: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of an explicit hashing pass.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeOutcome {
    pub success: bool,
    pub hashed_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a single-file deletion.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a batch deletion. `success` only when every item succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct BatchDeleteOutcome {
    pub success: bool,
    pub deleted_count: u64,
    pub errors: Vec<String>,
}

/// The duplicate-detection engine: one root tree, one inventory.
pub struct Engine {
    root: PathBuf,
    store: InventoryStore,
    coordinator: JobCoordinator,
    delete_mode: DeleteMode,
}

impl Engine {
    /// Create an engine over `root` backed by `store`.
    #[must_use]
    pub fn new(root: PathBuf, store: InventoryStore) -> Self {
        Self {
            root,
            store,
            coordinator: JobCoordinator::new(),
            delete_mode: DeleteMode::default(),
        }
    }

    /// Set how deletions remove file bytes (permanent or trash).
    #[must_use]
    pub fn with_delete_mode(mut self, mode: DeleteMode) -> Self {
        self.delete_mode = mode;
        self
    }

    /// The scanned root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The job coordinator, for cancellation wiring and progress polling.
    #[must_use]
    pub fn coordinator(&self) -> &JobCoordinator {
        &self.coordinator
    }

    /// Start a full scan+hash job. Fails fast (with the in-flight job left
    /// undisturbed) if one is already running.
    pub fn trigger_scan(&self) -> ScanOutcome {
        match self.coordinator.run_scan(&self.root, &self.store) {
            Ok(summary) => ScanOutcome {
                success: true,
                files_counted: summary.files_counted,
                error: None,
            },
            Err(e) => ScanOutcome {
                success: false,
                files_counted: 0,
                error: Some(e.to_string()),
            },
        }
    }

    /// Run the lazy hashing pass explicitly, outside a full job.
    pub fn analyze_duplicates(&self) -> AnalyzeOutcome {
        match self.coordinator.run_hash_only(&self.root, &self.store) {
            Ok(hashed_count) => AnalyzeOutcome {
                success: true,
                hashed_count,
                error: None,
            },
            Err(e) => AnalyzeOutcome {
                success: false,
                hashed_count: 0,
                error: Some(e.to_string()),
            },
        }
    }

    /// Materialize duplicate groups from the current inventory snapshot.
    /// Safe to call at any time, including mid-job.
    pub fn duplicate_groups(&self) -> Result<Vec<DuplicateGroup>, InventoryError> {
        duplicate_groups(&self.store)
    }

    /// Delete one file (bytes and record) by its record identity.
    pub fn delete_file(&self, path: &str) -> DeleteOutcome {
        let executor = DeletionExecutor::new(&self.root, &self.store).with_mode(self.delete_mode);
        match executor.delete_one(path) {
            Ok(_) => DeleteOutcome {
                success: true,
                error: None,
            },
            Err(e) => DeleteOutcome {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }

    /// Delete a batch of files, continuing past per-item failures.
    pub fn delete_files(&self, paths: &[String]) -> BatchDeleteOutcome {
        let executor = DeletionExecutor::new(&self.root, &self.store).with_mode(self.delete_mode);
        let result = executor.delete_batch(paths);
        BatchDeleteOutcome {
            success: result.all_succeeded(),
            deleted_count: result.deleted_count() as u64,
            errors: result
                .failures
                .into_iter()
                .map(|(path, message)| format!("{path}: {message}"))
                .collect(),
        }
    }

    /// Aggregate counters over the whole inventory.
    pub fn scan_stats(&self) -> Result<ScanStats, InventoryError> {
        self.store.stats()
    }

    /// Snapshot of the job coordinator's observable state.
    #[must_use]
    pub fn scan_progress(&self) -> ScanProgress {
        self.coordinator.progress()
    }
}
