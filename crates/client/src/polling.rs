//! Timing parameters for the two status polling loops.

use std::time::Duration;

/// Delay between raw-model status polls while the upload is processed.
pub const DEFAULT_PROCESSING_INTERVAL: Duration = Duration::from_secs(1);

/// The processing-wait loop logs a status line whenever the elapsed whole
/// seconds are a multiple of this value.
pub const DEFAULT_STATUS_REPORT_EVERY_SECS: u64 = 5;

/// Tunable parameters for the polling loops.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Sleep between processing-wait polls.
    pub processing_interval: Duration,
    /// Cadence of the elapsed-time status line during processing-wait.
    /// `0` disables the line.
    pub status_report_every_secs: u64,
    /// Sleep between optimization-wait polls. Zero polls back to back.
    pub optimization_interval: Duration,
    /// Upper bound on each loop. `None` waits until the server reports a
    /// terminal status.
    pub max_wait: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            processing_interval: DEFAULT_PROCESSING_INTERVAL,
            status_report_every_secs: DEFAULT_STATUS_REPORT_EVERY_SECS,
            optimization_interval: Duration::ZERO,
            max_wait: None,
        }
    }
}

impl PollConfig {
    /// Whether a loop that has run for `elapsed` should give up.
    pub fn deadline_exceeded(&self, elapsed: Duration) -> bool {
        self.max_wait.is_some_and(|max| elapsed >= max)
    }

    /// Whether the processing-wait loop should log at `elapsed_secs`.
    pub fn should_report(&self, elapsed_secs: u64) -> bool {
        self.status_report_every_secs > 0 && elapsed_secs % self.status_report_every_secs == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_wait_forever() {
        let c = PollConfig::default();
        assert_eq!(c.processing_interval, Duration::from_secs(1));
        assert_eq!(c.optimization_interval, Duration::ZERO);
        assert!(!c.deadline_exceeded(Duration::from_secs(86_400 * 365)));
    }

    #[test]
    fn max_wait_bounds_loop() {
        let c = PollConfig {
            max_wait: Some(Duration::from_secs(10)),
            ..Default::default()
        };
        assert!(!c.deadline_exceeded(Duration::from_secs(9)));
        assert!(c.deadline_exceeded(Duration::from_secs(10)));
    }

    #[test]
    fn report_every_five_seconds() {
        let c = PollConfig::default();
        let reported: Vec<u64> = (0..=12).filter(|s| c.should_report(*s)).collect();
        assert_eq!(reported, vec![0, 5, 10]);
    }

    #[test]
    fn zero_cadence_disables_report() {
        let c = PollConfig {
            status_report_every_secs: 0,
            ..Default::default()
        };
        assert!(!c.should_report(0));
        assert!(!c.should_report(5));
    }
}
