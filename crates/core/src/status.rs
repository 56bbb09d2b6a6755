//! Remote status values and their classification.
//!
//! Both polling loops share one rule: a single value means success, a
//! small set of values means "keep polling", and anything else is a
//! terminal failure carrying the unexpected value.

/* --------------------------------------------------------------------------
   Raw model (base asset) upload status
   -------------------------------------------------------------------------- */

pub const UPLOAD_STATUS_WAITING: &str = "waiting";
pub const UPLOAD_STATUS_UNZIPPING: &str = "unzipping";
pub const UPLOAD_STATUS_ANALYSING: &str = "analysing";
pub const UPLOAD_STATUS_COMPLETE: &str = "complete";

/// Upload statuses that mean the server is still processing.
pub const UPLOAD_PENDING_STATUSES: &[&str] = &[
    UPLOAD_STATUS_WAITING,
    UPLOAD_STATUS_UNZIPPING,
    UPLOAD_STATUS_ANALYSING,
];

/* --------------------------------------------------------------------------
   Rapid model (optimization job) status
   -------------------------------------------------------------------------- */

pub const OPTIMIZATION_STATUS_QUEUED: &str = "sent_to_queue";
pub const OPTIMIZATION_STATUS_DONE: &str = "done";

/// Outcome of a single status observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// Not finished yet; poll again.
    Pending,
    /// Terminal success.
    Succeeded,
    /// Terminal failure with the unexpected status value.
    Failed(String),
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Classify a raw-model `upload_status` value.
pub fn classify_upload_status(status: &str) -> PollState {
    if status == UPLOAD_STATUS_COMPLETE {
        PollState::Succeeded
    } else if UPLOAD_PENDING_STATUSES.contains(&status) {
        PollState::Pending
    } else {
        PollState::Failed(status.to_string())
    }
}

/// Classify a rapid-model `optimization_status` value.
pub fn classify_optimization_status(status: &str) -> PollState {
    match status {
        OPTIMIZATION_STATUS_DONE => PollState::Succeeded,
        OPTIMIZATION_STATUS_QUEUED => PollState::Pending,
        other => PollState::Failed(other.to_string()),
    }
}
