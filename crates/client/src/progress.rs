//! Progress display for the two polling loops.

use std::io::Write;

use rapid_core::progress::{format_elapsed, progress_line};
use rapid_core::types::AssetId;

/// Receives updates from the polling loops.
pub trait ProgressReporter: Send + Sync {
    /// Periodic status line while an uploaded asset is processed.
    fn processing_status(&self, asset_id: AssetId, elapsed_secs: u64, status: &str);

    /// `progress` is 0-100; `step` may be empty.
    fn optimization_progress(&self, progress: u8, step: &str);
}

/// Logs processing status and redraws a single progress line on stdout,
/// ending it at 100%.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalProgress;

impl ProgressReporter for TerminalProgress {
    fn processing_status(&self, asset_id: AssetId, elapsed_secs: u64, status: &str) {
        tracing::info!(
            asset_id,
            status,
            "Waiting for processing... ({}) Status: {status}",
            format_elapsed(elapsed_secs),
        );
    }

    fn optimization_progress(&self, progress: u8, step: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout must not fail the job.
        let _ = write!(out, "\r{}", progress_line(progress, step));
        if progress >= 100 {
            let _ = writeln!(out);
        }
        let _ = out.flush();
    }
}

/// Discards progress updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn processing_status(&self, _asset_id: AssetId, _elapsed_secs: u64, _status: &str) {}

    fn optimization_progress(&self, _progress: u8, _step: &str) {}
}
