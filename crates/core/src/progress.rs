//! Text formatting for progress output.

/// Width of the progress bar in characters, excluding brackets.
pub const PROGRESS_BAR_WIDTH: usize = 20;

/// Column the `|  step` label is padded to, so a shorter label fully
/// overwrites a longer one on the same terminal line.
pub const STEP_LABEL_WIDTH: usize = 45;

/// Render `[#####_______________]` for a 0-100 percentage.
///
/// Values above 100 are clamped.
pub fn progress_bar(progress: u8, width: usize) -> String {
    let progress = progress.min(100) as usize;
    let filled = width * progress / 100;
    format!("[{}{}]", "#".repeat(filled), "_".repeat(width - filled))
}

/// Render a full progress line (without carriage return).
///
/// ```
/// use rapid_core::progress::progress_line;
///
/// assert_eq!(progress_line(50, ""), "Progress: [##########__________] 50%");
/// ```
pub fn progress_line(progress: u8, step: &str) -> String {
    let bar = progress_bar(progress, PROGRESS_BAR_WIDTH);
    let step_info = if step.is_empty() {
        String::new()
    } else {
        format!("{:<width$}", format!("  |  {step}"), width = STEP_LABEL_WIDTH)
    };
    format!("Progress: {bar} {progress}%{step_info}")
}

/// Format elapsed whole seconds as `42s` or `3m 7s`.
pub fn format_elapsed(total_secs: u64) -> String {
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
