//! Terminal progress display using indicatif.
//!
//! The scan runs on a worker thread; the main thread polls the job
//! coordinator for [`ScanProgress`] snapshots and feeds them to a
//! [`ProgressDisplay`]. Rendering is therefore decoupled from the scan loop
//! and never slows it down.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::job::{JobStatus, ScanProgress};

/// Interval at which the main thread polls for progress snapshots.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Spinner-based progress display for scan and analysis phases.
///
/// File counts are unknown up front (the walk discovers them), so both
/// phases render as a spinner with a live counter rather than a bounded bar.
pub struct ProgressDisplay {
    bar: ProgressBar,
    quiet: bool,
    last_status: JobStatus,
}

impl ProgressDisplay {
    /// Create a new display.
    ///
    /// When `quiet` is true nothing is drawn; updates become no-ops.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self {
            bar,
            quiet,
            last_status: JobStatus::Idle,
        }
    }

    /// Render a progress snapshot.
    pub fn update(&mut self, snapshot: &ScanProgress) {
        if self.quiet {
            return;
        }
        if snapshot.status != self.last_status {
            self.bar.println(phase_banner(snapshot.status));
            self.last_status = snapshot.status;
        }
        self.bar.set_position(snapshot.scanned_files);
        if let Some(current) = &snapshot.current_file {
            self.bar.set_message(truncate_name(current, 40));
        }
    }

    /// Tear down the display, printing a final line for the terminal state.
    pub fn finish(self, snapshot: &ScanProgress) {
        if self.quiet {
            return;
        }
        self.bar.finish_and_clear();
        if let Some(message) = &snapshot.message {
            match snapshot.status {
                JobStatus::Error => eprintln!("error: {}", message),
                _ => println!("{}", message),
            }
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} files {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
}

fn phase_banner(status: JobStatus) -> String {
    match status {
        JobStatus::Scanning => "Scanning file system...".to_string(),
        JobStatus::Hashing => "Hashing duplicate candidates...".to_string(),
        other => other.to_string(),
    }
}

/// Truncate a file name for display, keeping the tail end.
fn truncate_name(name: &str, max_len: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_len {
        return name.to_string();
    }
    let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
    format!("...{}", tail)
}
