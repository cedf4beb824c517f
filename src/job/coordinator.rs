//! Single-flight scan/hash job state machine.
//!
//! At most one job mutates the inventory in bulk at any time, process-wide.
//! The gate is an atomic flag acquired with compare-exchange, so mutual
//! exclusion is structural rather than a calling convention. A rejected
//! trigger leaves the in-flight job's progress counters untouched.
//!
//! State machine:
//!
//! ```text
//! idle | done | error --trigger--> scanning --auto--> hashing --> done
//!                                      |                  |
//!                                      +------ error -----+
//! scanning | hashing --trigger--> rejected ("already in progress")
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::inventory::InventoryStore;
use crate::scanner::{HashError, Hasher, ScanError, ScanObserver, Walker};

/// Job state, readable at any time via [`JobCoordinator::progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Scanning,
    Hashing,
    Done,
    Error,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Hashing => "hashing",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Snapshot of the coordinator's observable state.
///
/// Reading a snapshot never blocks the running job beyond a brief lock on
/// the progress cell.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanProgress {
    /// Current state of the job machine.
    pub status: JobStatus,
    /// Files upserted so far by the active (or last) walk phase.
    pub scanned_files: u64,
    /// Total files if known in advance; 0 when unknown.
    pub total_files: u64,
    /// Base name of the file currently being processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
    /// Human-readable status message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Outcome of a completed scan+hash job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    /// Files upserted by the walk phase.
    pub files_counted: u64,
    /// Records newly hashed by the hashing phase.
    pub hashed_count: u64,
}

/// Errors surfaced to the caller that triggered a job.
#[derive(thiserror::Error, Debug)]
pub enum JobError {
    /// A scan/hash job is already active; the trigger was rejected and the
    /// state machine is unchanged.
    #[error("scan already in progress")]
    AlreadyInProgress,

    /// The walk phase failed; the job stopped in the error state.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The hashing phase failed; the job stopped in the error state.
    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Coordinates the Walker -> Hasher pipeline and owns the progress state.
pub struct JobCoordinator {
    active: AtomicBool,
    cancel: Arc<AtomicBool>,
    progress: Mutex<ScanProgress>,
}

impl Default for JobCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl JobCoordinator {
    /// Create a coordinator in the `idle` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            cancel: Arc::new(AtomicBool::new(false)),
            progress: Mutex::new(ScanProgress::default()),
        }
    }

    /// Snapshot of the current progress. Never blocks the job.
    #[must_use]
    pub fn progress(&self) -> ScanProgress {
        self.lock_progress().clone()
    }

    /// The flag checked by the walker and hasher between files.
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Request cancellation of the active job. The job transitions to the
    /// error state at its next between-files check.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Run a full scan+hash job: walk the whole tree, then hash candidates.
    ///
    /// Fails fast with [`JobError::AlreadyInProgress`] if a job is active,
    /// leaving the in-flight job's progress untouched. Any phase error moves
    /// the machine to `error` with the message captured; the inventory is
    /// left in whatever partial state it reached, which is safe to re-scan
    /// because upserts are idempotent.
    pub fn run_scan(&self, root: &Path, store: &InventoryStore) -> Result<JobSummary, JobError> {
        let _guard = self.begin()?;

        self.reset(JobStatus::Scanning, "scanning file system");
        log::info!("Scan job started for {}", root.display());

        let walk_observer = WalkPhaseObserver { progress: &self.progress };
        let walker = Walker::new(root, store)
            .with_cancel_flag(self.cancel_flag())
            .with_observer(&walk_observer);
        let files_counted = match walker.walk() {
            Ok(n) => n,
            Err(e) => {
                self.fail(&e.to_string());
                return Err(e.into());
            }
        };

        self.transition(JobStatus::Hashing, "analyzing duplicate candidates");

        let hash_observer = HashPhaseObserver { progress: &self.progress };
        let hasher = Hasher::new(root, store)
            .with_cancel_flag(self.cancel_flag())
            .with_observer(&hash_observer);
        let hashed_count = match hasher.hash_pending() {
            Ok(n) => n,
            Err(e) => {
                self.fail(&e.to_string());
                return Err(e.into());
            }
        };

        self.finish(&format!(
            "scan complete: {files_counted} files, {hashed_count} newly hashed"
        ));
        log::info!(
            "Scan job done: {} files, {} new digests",
            files_counted,
            hashed_count
        );
        Ok(JobSummary {
            files_counted,
            hashed_count,
        })
    }

    /// Run the hashing phase alone, against the current inventory snapshot.
    ///
    /// Goes through the same single-flight gate as a full job: bulk store
    /// mutation belongs to one active job at a time.
    pub fn run_hash_only(&self, root: &Path, store: &InventoryStore) -> Result<u64, JobError> {
        let _guard = self.begin()?;

        self.transition(JobStatus::Hashing, "analyzing duplicate candidates");

        let hash_observer = HashPhaseObserver { progress: &self.progress };
        let hasher = Hasher::new(root, store)
            .with_cancel_flag(self.cancel_flag())
            .with_observer(&hash_observer);
        match hasher.hash_pending() {
            Ok(hashed) => {
                self.finish(&format!("analysis complete: {hashed} digests computed"));
                Ok(hashed)
            }
            Err(e) => {
                self.fail(&e.to_string());
                Err(e.into())
            }
        }
    }

    /// Acquire the single-flight gate, or reject without state changes.
    fn begin(&self) -> Result<JobGuard<'_>, JobError> {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| JobError::AlreadyInProgress)?;
        // A fresh trigger starts a fresh job; stale cancel requests from a
        // previous job do not carry over.
        self.cancel.store(false, Ordering::SeqCst);
        Ok(JobGuard { active: &self.active })
    }

    fn lock_progress(&self) -> std::sync::MutexGuard<'_, ScanProgress> {
        self.progress.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn reset(&self, status: JobStatus, message: &str) {
        let mut p = self.lock_progress();
        *p = ScanProgress {
            status,
            message: Some(message.to_string()),
            ..ScanProgress::default()
        };
    }

    fn transition(&self, status: JobStatus, message: &str) {
        let mut p = self.lock_progress();
        p.status = status;
        p.message = Some(message.to_string());
        p.current_file = None;
    }

    fn finish(&self, message: &str) {
        let mut p = self.lock_progress();
        p.status = JobStatus::Done;
        p.message = Some(message.to_string());
        p.current_file = None;
    }

    fn fail(&self, message: &str) {
        let mut p = self.lock_progress();
        p.status = JobStatus::Error;
        p.message = Some(message.to_string());
        p.current_file = None;
        log::error!("Scan job failed: {}", message);
    }
}

/// Releases the single-flight gate when the job ends, on any path out.
struct JobGuard<'a> {
    active: &'a AtomicBool,
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

struct WalkPhaseObserver<'a> {
    progress: &'a Mutex<ScanProgress>,
}

impl ScanObserver for WalkPhaseObserver<'_> {
    fn on_file(&self, name: &str) {
        let mut p = self.progress.lock().unwrap_or_else(|e| e.into_inner());
        p.scanned_files += 1;
        p.current_file = Some(name.to_string());
    }
}

struct HashPhaseObserver<'a> {
    progress: &'a Mutex<ScanProgress>,
}

impl ScanObserver for HashPhaseObserver<'_> {
    fn on_file(&self, name: &str) {
        let mut p = self.progress.lock().unwrap_or_else(|e| e.into_inner());
        p.current_file = Some(name.to_string());
    }
}
