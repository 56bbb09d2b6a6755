//! REST client for the RapidPipeline v2 API.
//!
//! [`RapidPipelineApi`] wraps the raw-model (base asset) and rapid-model
//! (optimization job) endpoints and owns the two polling loops: waiting
//! for an uploaded asset to finish processing, and waiting for an
//! optimization job to finish before downloading its artifacts.
//!
//! The client keeps no state between calls beyond its configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tokio::time::Instant;

use rapid_core::config::Credentials;
use rapid_core::naming::output_path;
use rapid_core::preset::Preset;
use rapid_core::status::{classify_optimization_status, classify_upload_status, PollState};
use rapid_core::types::{AssetId, JobId};

use crate::backend::HttpBackend;
use crate::error::ApiError;
use crate::polling::PollConfig;
use crate::progress::{ProgressReporter, TerminalProgress};
use crate::transport::{RetryPolicy, Transport};

/// Default API root. Endpoint paths are appended to it directly.
pub const DEFAULT_BASE_URL: &str = "https://api.rapidpipeline.com/api/v2/";

/// Base name of the single file announced when requesting upload slots.
pub const UPLOAD_FILE_STEM: &str = "rapid";

/// File name announced for an upload with extension `file_ext` (`.glb`).
pub fn upload_filename(file_ext: &str) -> String {
    format!("{UPLOAD_FILE_STEM}{file_ext}")
}

/// Server-issued upload bundle from `rawmodel/api-upload/start`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadSession {
    /// ID of the raw model being created.
    pub id: AssetId,
    pub links: UploadLinks,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadLinks {
    /// Presigned PUT URLs keyed by announced file name.
    pub s3_upload_urls: HashMap<String, String>,
}

impl UploadSession {
    pub fn upload_url(&self, file_ext: &str) -> Option<&str> {
        self.links
            .s3_upload_urls
            .get(&upload_filename(file_ext))
            .map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct RawModelStatus {
    upload_status: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: JobId,
}

/// Status document of a rapid model (optimization job).
#[derive(Debug, Clone, Deserialize)]
pub struct RapidModelStatus {
    pub optimization_status: String,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub processing_step: Option<String>,
    #[serde(default)]
    pub downloads: Option<Downloads>,
}

/// Artifact download links of a finished job, in server order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Downloads {
    /// Output type (e.g. `glb`, `usdz`) to download URL.
    #[serde(default)]
    pub all: IndexMap<String, String>,
}

/// Client for one RapidPipeline API root and one set of credentials.
pub struct RapidPipelineApi<B> {
    transport: Transport<B>,
    base_url: String,
    auth_headers: Vec<(String, String)>,
    poll: PollConfig,
    progress: Arc<dyn ProgressReporter>,
}

impl<B: HttpBackend> RapidPipelineApi<B> {
    /// Create a client. A missing trailing slash on `base_url` is added.
    pub fn new(backend: B, base_url: impl Into<String>, credentials: &Credentials) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Self {
            transport: Transport::new(backend),
            base_url,
            auth_headers: vec![
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", credentials.token()),
                ),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            poll: PollConfig::default(),
            progress: Arc::new(TerminalProgress),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.transport = self.transport.with_retry(retry);
        self
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let json = self.transport.get_json(url, &self.auth_headers).await?;
        decode(url, json)
    }

    // ---- upload ----

    /// Request presigned upload URLs for one model file.
    pub async fn request_upload_slots(
        &self,
        file_ext: &str,
        label: &str,
    ) -> Result<UploadSession, ApiError> {
        tracing::info!(model = %label, "Starting upload for model");

        let url = self.url("rawmodel/api-upload/start");
        let payload = serde_json::json!({
            "filenames": [upload_filename(file_ext)],
            "model_name": label,
        });
        let json = self
            .transport
            .post_json(&url, &self.auth_headers, &payload)
            .await?;
        decode(&url, json)
    }

    /// Upload the file at `path` through `session`, then finalize it.
    ///
    /// The file is read fully into memory and sent as one PUT. Nothing is
    /// finalized if the file cannot be read or the PUT fails.
    pub async fn upload_asset(
        &self,
        path: &Path,
        file_ext: &str,
        session: &UploadSession,
    ) -> Result<(), ApiError> {
        let data = tokio::fs::read(path).await.map_err(|source| {
            tracing::error!(path = %path.display(), error = %source, "Cannot open model file");
            ApiError::ReadInput {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let filename = upload_filename(file_ext);
        let upload_url = session.upload_url(file_ext).ok_or_else(|| {
            tracing::error!(asset_id = session.id, file = %filename, "Upload session has no URL for file");
            ApiError::MissingUploadUrl(filename.clone())
        })?;

        tracing::info!(asset_id = session.id, bytes = data.len(), "Uploading model file");
        self.transport.put_binary(upload_url, data).await?;

        self.finalize_upload(session.id).await
    }

    /// Mark the upload complete and wait for server-side processing.
    pub async fn finalize_upload(&self, asset_id: AssetId) -> Result<(), ApiError> {
        tracing::info!(asset_id, "Finalizing upload");
        let url = self.url(&format!("rawmodel/{asset_id}/api-upload/complete"));
        self.transport.get_json(&url, &self.auth_headers).await?;

        tracing::info!(asset_id, "Waiting for model to finish analysing");
        self.wait_for_processing(asset_id).await
    }

    /// Current `upload_status` of a raw model.
    pub async fn asset_status(&self, asset_id: AssetId) -> Result<String, ApiError> {
        let url = self.url(&format!("rawmodel/{asset_id}"));
        let status: Envelope<RawModelStatus> = self.get(&url).await?;
        Ok(status.data.upload_status)
    }

    /// Poll the raw model once per interval until it is `complete`.
    ///
    /// Any status outside the processing states is a terminal failure, as
    /// is a transport failure on any poll.
    pub async fn wait_for_processing(&self, asset_id: AssetId) -> Result<(), ApiError> {
        let start = Instant::now();

        loop {
            let status = self.asset_status(asset_id).await?;

            match classify_upload_status(&status) {
                PollState::Succeeded => return Ok(()),
                PollState::Failed(value) => {
                    tracing::error!(asset_id, status = %value, "Unexpected status: {value}");
                    return Err(ApiError::UnexpectedUploadStatus(value));
                }
                PollState::Pending => {}
            }

            let elapsed = start.elapsed();
            let elapsed_secs = elapsed.as_secs();
            if self.poll.should_report(elapsed_secs) {
                self.progress.processing_status(asset_id, elapsed_secs, &status);
            }

            if self.poll.deadline_exceeded(elapsed) {
                tracing::error!(asset_id, status = %status, "Gave up waiting for processing");
                return Err(ApiError::WaitTimeout(elapsed));
            }

            tokio::time::sleep(self.poll.processing_interval).await;
        }
    }

    // ---- optimization ----

    /// Submit `preset` against a processed raw model. Returns the job ID.
    pub async fn submit_optimization(
        &self,
        asset_id: AssetId,
        preset: &Preset,
    ) -> Result<JobId, ApiError> {
        let url = self.url(&format!("rawmodel/optimize/{asset_id}"));
        let json = self
            .transport
            .post_json(&url, &self.auth_headers, preset)
            .await?;
        let response: SubmitResponse = decode(&url, json)?;
        Ok(response.id)
    }

    /// Current status document of an optimization job.
    pub async fn job_status(&self, job_id: JobId) -> Result<RapidModelStatus, ApiError> {
        let url = self.url(&format!("rapidmodel/{job_id}"));
        let status: Envelope<RapidModelStatus> = self.get(&url).await?;
        Ok(status.data)
    }

    /// Poll a job until `done`, then download every artifact under
    /// `output_prefix`.
    ///
    /// Progress is reported on every queued poll that carries it. Errors
    /// for which [`ApiError::job_finished`] holds come from a job that
    /// reached `done`.
    pub async fn wait_for_optimization(
        &self,
        job_id: JobId,
        output_prefix: &str,
    ) -> Result<Vec<PathBuf>, ApiError> {
        tracing::info!(job_id, "Waiting for optimization to complete");
        let start = Instant::now();

        loop {
            let status = self.job_status(job_id).await?;

            match classify_optimization_status(&status.optimization_status) {
                PollState::Succeeded => {
                    let downloads = status.downloads.ok_or_else(|| {
                        tracing::error!(job_id, "Finished job has no downloads");
                        ApiError::NoDownloads(job_id)
                    })?;
                    return self.download_outputs(&downloads, output_prefix).await;
                }
                PollState::Failed(value) => {
                    tracing::error!(
                        job_id,
                        status = %value,
                        "Unexpected status code from optimization run ({value})"
                    );
                    return Err(ApiError::UnexpectedOptimizationStatus(value));
                }
                PollState::Pending => {
                    if let Some(progress) = status.progress {
                        let step = status.processing_step.as_deref().unwrap_or("");
                        self.progress
                            .optimization_progress(progress.clamp(0.0, 100.0) as u8, step);
                    }
                }
            }

            let elapsed = start.elapsed();
            if self.poll.deadline_exceeded(elapsed) {
                tracing::error!(job_id, "Gave up waiting for optimization");
                return Err(ApiError::WaitTimeout(elapsed));
            }

            if self.poll.optimization_interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.poll.optimization_interval).await;
            }
        }
    }

    /// Download every artifact in `downloads`.
    ///
    /// All entries are attempted even if one fails; the call fails if any
    /// did.
    pub async fn download_outputs(
        &self,
        downloads: &Downloads,
        output_prefix: &str,
    ) -> Result<Vec<PathBuf>, ApiError> {
        let total = downloads.all.len();
        let mut written = Vec::with_capacity(total);

        for (file_type, url) in &downloads.all {
            let path = PathBuf::from(output_path(url, output_prefix));
            match crate::download::download_file(&self.transport, url, &path).await {
                Ok(()) => written.push(path),
                Err(e) => {
                    tracing::error!(file_type = %file_type, error = %e, "Failed to download file");
                }
            }
        }

        let failed = total - written.len();
        if failed > 0 {
            return Err(ApiError::DownloadsFailed { failed, total });
        }
        Ok(written)
    }

    // ---- cleanup ----

    /// Delete a raw model from cloud storage.
    pub async fn delete_base_asset(&self, asset_id: AssetId) -> Result<(), ApiError> {
        tracing::info!(asset_id, "Deleting base asset from cloud storage");
        let url = self.url(&format!("rawmodel/{asset_id}"));
        self.transport.delete(&url, &self.auth_headers).await?;
        Ok(())
    }

    /// Delete an optimized model from cloud storage.
    pub async fn delete_optimized_asset(&self, job_id: JobId) -> Result<(), ApiError> {
        tracing::info!(job_id, "Deleting optimized model from cloud storage");
        let url = self.url(&format!("rapidmodel/{job_id}"));
        self.transport.delete(&url, &self.auth_headers).await?;
        Ok(())
    }
}

/// Deserialize a JSON response into its expected shape.
fn decode<T: DeserializeOwned>(url: &str, json: Value) -> Result<T, ApiError> {
    serde_json::from_value(json).map_err(|e| {
        tracing::error!(url, error = %e, "Unexpected response shape");
        ApiError::MalformedResponse(format!("{url}: {e}"))
    })
}
