//! `rapid-cli` -- upload 3D models to RapidPipeline, optimize them with a
//! set of presets and download the results.
//!
//! # Environment variables
//!
//! | Variable                 | Required | Default                                  | Description            |
//! |--------------------------|----------|------------------------------------------|------------------------|
//! | `RAPIDPIPELINE_BASE_URL` | no       | `https://api.rapidpipeline.com/api/v2/`  | API root (`--base-url`)|
//! | `RUST_LOG`               | no       | `rapid_cli=info,...`                     | Log filter             |
//!
//! Both may also be set in a `.env` file in the working directory.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rapid_cli::app::{load_config, run};
use rapid_cli::args::Args;
use rapid_client::backend::ReqwestBackend;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rapid_cli=info,rapid_client=info,rapid_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        base_url = %args.base_url,
        model = %args.model,
        cleanup = args.cleanup(),
        exit_on_error = args.exit_on_error,
        "Starting rapid-cli",
    );

    run(&args, config, ReqwestBackend::new()).await.exit_code()
}
