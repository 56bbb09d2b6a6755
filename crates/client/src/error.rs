use std::path::PathBuf;
use std::time::Duration;

use rapid_core::types::JobId;

use crate::transport::TransportError;

/// Errors from RapidPipeline API operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport-level failure (network, HTTP error status, bad JSON).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A JSON response did not have the expected shape.
    #[error("Unexpected response from server: {0}")]
    MalformedResponse(String),

    /// The local model file could not be read.
    #[error("Cannot open model file \"{}\": {source}", path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The upload session has no presigned URL for the expected file name.
    #[error("Upload session has no upload URL for \"{0}\"")]
    MissingUploadUrl(String),

    /// The raw model left the processing states with a value other than
    /// `complete`.
    #[error("Unexpected status: {0}")]
    UnexpectedUploadStatus(String),

    /// The optimization job left the queue with a value other than `done`.
    #[error("Unexpected status code from optimization run ({0})")]
    UnexpectedOptimizationStatus(String),

    /// A polling loop hit the configured maximum wait.
    #[error("Gave up waiting after {}s", .0.as_secs())]
    WaitTimeout(Duration),

    /// An artifact could not be written to disk.
    #[error("Cannot write output file \"{}\": {source}", path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A job reached `done` without a `downloads` block.
    #[error("Optimization {0} finished but lists no downloads")]
    NoDownloads(JobId),

    /// Some artifacts of a finished job could not be downloaded.
    #[error("{failed} of {total} downloads failed")]
    DownloadsFailed { failed: usize, total: usize },
}

impl ApiError {
    /// Whether the error was raised after the job reached `done`, so the
    /// job exists on the server and its artifacts are incomplete.
    pub fn job_finished(&self) -> bool {
        matches!(self, Self::NoDownloads(_) | Self::DownloadsFailed { .. })
    }
}
