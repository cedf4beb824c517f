//! Scan/hash job coordination.

pub mod coordinator;

pub use coordinator::{JobCoordinator, JobError, JobStatus, JobSummary, ScanProgress};
