//! Per-model workflow: resolve the base asset, run every preset against
//! it, then clean up.
//!
//! Failures are counted rather than propagated. Only the exit-on-error
//! switch turns a counted failure into [`RunAborted`], which skips every
//! remaining preset, input and cleanup step.

use std::path::{Path, PathBuf};

use rapid_client::api::RapidPipelineApi;
use rapid_client::backend::HttpBackend;
use rapid_client::error::ApiError;
use rapid_core::input::{
    ensure_model_file, file_extension, model_name, parse_base_asset_id, ModelInput,
};
use rapid_core::naming::output_prefix;
use rapid_core::preset::{Preset, PresetSet};
use rapid_core::types::{AssetId, JobId};

use crate::error::{InputError, RunAborted};

/// Switches that apply to every input of a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Delete the uploaded base asset and finished jobs afterwards.
    pub cleanup: bool,
    /// Abort the whole run on the first counted failure.
    pub exit_on_error: bool,
    /// Overrides the model name for upload and output naming.
    pub label: Option<String>,
    pub output_dir: PathBuf,
}

/// A base asset the presets run against.
struct ResolvedAsset {
    id: AssetId,
    name: String,
    /// Uploaded by this run, so cleanup may delete it.
    uploaded: bool,
}

#[derive(Debug)]
struct FailureCounter {
    count: usize,
    exit_on_error: bool,
}

impl FailureCounter {
    fn record(&mut self) -> Result<(), RunAborted> {
        self.count += 1;
        if self.exit_on_error {
            tracing::error!(failures = self.count, "Exit on error is set, stopping");
            return Err(RunAborted {
                failures: self.count,
            });
        }
        Ok(())
    }
}

/// Runs the preset set against one input at a time and keeps the failure
/// count across inputs.
pub struct JobOrchestrator<B> {
    api: RapidPipelineApi<B>,
    presets: PresetSet,
    options: RunOptions,
    failures: FailureCounter,
}

impl<B: HttpBackend> JobOrchestrator<B> {
    pub fn new(api: RapidPipelineApi<B>, presets: PresetSet, options: RunOptions) -> Self {
        let failures = FailureCounter {
            count: 0,
            exit_on_error: options.exit_on_error,
        };
        Self {
            api,
            presets,
            options,
            failures,
        }
    }

    /// Failures counted so far.
    pub fn failures(&self) -> usize {
        self.failures.count
    }

    /// Count one failure. Errors when the run must stop.
    pub fn record_failure(&mut self) -> Result<(), RunAborted> {
        self.failures.record()
    }

    /// Process one input with every preset.
    pub async fn process_input(&mut self, input: &ModelInput) -> Result<(), RunAborted> {
        let asset = match self.resolve(input).await {
            Ok(asset) => asset,
            Err(e) => {
                tracing::error!(input = %input, error = %e, "Cannot process input");
                return self.record_failure();
            }
        };

        let model_name = self.label().unwrap_or(&asset.name).to_string();

        let mut jobs = Vec::new();
        for (preset_name, preset) in self.presets.iter() {
            tracing::info!(preset = preset_name, asset_id = asset.id, "Starting optimization");
            let prefix = output_prefix(&self.options.output_dir, &model_name, preset_name);

            let (job_id, result) = match run_preset(&self.api, asset.id, preset, &prefix).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(preset = preset_name, error = %e, "Optimization failed");
                    self.failures.record()?;
                    continue;
                }
            };

            // The job finished, so it is cleaned up even if a download failed.
            jobs.push(job_id);
            match result {
                Ok(files) => {
                    tracing::info!(
                        preset = preset_name,
                        job_id,
                        files = files.len(),
                        "Optimization complete",
                    );
                }
                Err(e) => {
                    tracing::error!(preset = preset_name, job_id, error = %e, "Download failed");
                    self.failures.record()?;
                }
            }
        }

        if self.options.cleanup {
            self.cleanup(&asset, &jobs).await;
        }
        Ok(())
    }

    fn label(&self) -> Option<&str> {
        self.options.label.as_deref().filter(|l| !l.is_empty())
    }

    async fn resolve(&self, input: &ModelInput) -> Result<ResolvedAsset, InputError> {
        match input {
            ModelInput::BaseAsset(token) => {
                let id = parse_base_asset_id(token)?;
                tracing::info!(asset_id = id, "Processing base asset ID");
                Ok(ResolvedAsset {
                    id,
                    name: id.to_string(),
                    uploaded: false,
                })
            }
            ModelInput::LocalFile(path) => {
                let (id, name) = self.upload(path).await?;
                Ok(ResolvedAsset {
                    id,
                    name,
                    uploaded: true,
                })
            }
        }
    }

    async fn upload(&self, path: &Path) -> Result<(AssetId, String), InputError> {
        ensure_model_file(path)?;

        let name = model_name(path);
        let ext = file_extension(path);
        tracing::info!(model = %name, "Processing model");

        let label = self.label().unwrap_or(&name);
        let session = self.api.request_upload_slots(&ext, label).await?;
        self.api.upload_asset(path, &ext, &session).await?;
        Ok((session.id, name))
    }

    /// Delete what this input left on the server. Failures are logged only.
    async fn cleanup(&self, asset: &ResolvedAsset, jobs: &[JobId]) {
        tracing::info!(
            asset_id = asset.id,
            jobs = jobs.len(),
            "Cleaning up: deleting optimized results",
        );

        if asset.uploaded {
            if let Err(e) = self.api.delete_base_asset(asset.id).await {
                tracing::warn!(asset_id = asset.id, error = %e, "Failed to delete base asset");
            }
        } else {
            tracing::info!(
                asset_id = asset.id,
                "Skipping deletion of base asset as it was processed using base asset ID mode",
            );
        }

        for &job_id in jobs {
            if let Err(e) = self.api.delete_optimized_asset(job_id).await {
                tracing::warn!(job_id, error = %e, "Failed to delete optimized model");
            }
        }
    }
}

/// Submit one preset and wait for it. The outer error means no job
/// finished; the inner result is the download outcome of a finished job.
async fn run_preset<B: HttpBackend>(
    api: &RapidPipelineApi<B>,
    asset_id: AssetId,
    preset: &Preset,
    prefix: &str,
) -> Result<(JobId, Result<Vec<PathBuf>, ApiError>), ApiError> {
    let job_id = api.submit_optimization(asset_id, preset).await?;
    match api.wait_for_optimization(job_id, prefix).await {
        Ok(files) => Ok((job_id, Ok(files))),
        Err(e) if e.job_finished() => Ok((job_id, Err(e))),
        Err(e) => Err(e),
    }
}
