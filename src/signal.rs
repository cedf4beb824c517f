//! Ctrl+C handling for graceful interruption.
//!
//! A single shared `AtomicBool` is flipped when SIGINT arrives. Long-running
//! phases (walking, hashing) check the flag between files and stop cleanly,
//! leaving the inventory database consistent. The process then exits with
//! code 130 (128 + SIGINT).

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

/// Install a Ctrl+C handler that sets `flag` on interrupt.
///
/// Call once, early in startup, with the cancellation flag of the job
/// coordinator. A second interrupt while cleanup is in progress kills the
/// process outright via the default disposition of `ctrlc`'s termination
/// feature.
pub fn install(flag: Arc<AtomicBool>) -> Result<(), SignalError> {
    ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            // Second Ctrl+C: give up on graceful shutdown.
            std::process::exit(crate::error::ExitCode::Interrupted.as_i32());
        }
        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "\nInterrupted. Finishing current file...");
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_starts_unset() {
        let flag = Arc::new(AtomicBool::new(false));
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[test]
    fn swapped_flag_reports_previous_value() {
        let flag = Arc::new(AtomicBool::new(false));
        assert!(!flag.swap(true, Ordering::SeqCst));
        assert!(flag.swap(true, Ordering::SeqCst));
    }
}
