//! Run setup: configuration loading and wiring of the client, orchestrator
//! and batch loop.

use std::process::ExitCode;

use rapid_client::api::RapidPipelineApi;
use rapid_client::backend::HttpBackend;
use rapid_client::polling::PollConfig;
use rapid_core::config::{load_credentials, load_presets_file, load_settings, Credentials};
use rapid_core::error::CoreError;
use rapid_core::preset::{validate_presets, PresetSet};
use rapid_core::schema::ConfigSchema;

use crate::args::Args;
use crate::batch::{run_batch, BatchSummary};
use crate::error::RunAborted;
use crate::orchestrator::{JobOrchestrator, RunOptions};

/// Exit code when exit-on-error stopped the run.
pub const EXIT_ABORTED: u8 = 2;

/// Validated configuration, loaded before any network call.
#[derive(Debug)]
pub struct RunConfig {
    pub credentials: Credentials,
    pub presets: PresetSet,
}

/// Load credentials, settings and presets named by `args`.
///
/// An unreadable schema is logged and leaves only `preset_id` presets
/// usable.
pub fn load_config(args: &Args) -> Result<RunConfig, CoreError> {
    let credentials = load_credentials(&args.credentials_file)?;
    let settings = load_settings(&args.settings_file)?;
    let presets_file = load_presets_file(&args.presets_file)?;

    let schema = match ConfigSchema::load(&settings.schema_path) {
        Ok(schema) => Some(schema),
        Err(e) => {
            tracing::error!(error = %e, "Inline config presets cannot be validated");
            None
        }
    };

    let presets = validate_presets(&presets_file, schema.as_ref())?;
    tracing::info!(presets = presets.len(), "Loaded presets");

    Ok(RunConfig {
        credentials,
        presets,
    })
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(BatchSummary),
    Aborted(RunAborted),
}

impl RunOutcome {
    /// 0 without failures, 1 with failures, 2 when aborted.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Completed(summary) if summary.failures == 0 => ExitCode::SUCCESS,
            Self::Completed(_) => ExitCode::FAILURE,
            Self::Aborted(_) => ExitCode::from(EXIT_ABORTED),
        }
    }

    pub fn failures(&self) -> usize {
        match self {
            Self::Completed(summary) => summary.failures,
            Self::Aborted(aborted) => aborted.failures,
        }
    }
}

/// Build the client over `backend` and process the model argument.
pub async fn run<B: HttpBackend>(args: &Args, config: RunConfig, backend: B) -> RunOutcome {
    let api = RapidPipelineApi::new(backend, args.base_url.as_str(), &config.credentials)
        .with_poll_config(PollConfig {
            max_wait: args.max_wait(),
            ..Default::default()
        });
    run_with_api(args, config.presets, api).await
}

/// Process the model argument with an already-built client.
pub async fn run_with_api<B: HttpBackend>(
    args: &Args,
    presets: PresetSet,
    api: RapidPipelineApi<B>,
) -> RunOutcome {
    let options = RunOptions {
        cleanup: args.cleanup(),
        exit_on_error: args.exit_on_error,
        label: args.label().map(str::to_string),
        output_dir: args.output_dir.clone(),
    };
    let mut orchestrator = JobOrchestrator::new(api, presets, options);

    match run_batch(&mut orchestrator, &args.model).await {
        Ok(summary) => {
            tracing::info!(
                inputs = summary.inputs,
                failures = summary.failures,
                "Finished processing",
            );
            RunOutcome::Completed(summary)
        }
        Err(aborted) => {
            tracing::error!(failures = aborted.failures, "Run aborted");
            RunOutcome::Aborted(aborted)
        }
    }
}
