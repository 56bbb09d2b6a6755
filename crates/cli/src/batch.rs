//! Expansion of the command-line input into a worklist, and the batch loop.

use std::path::Path;

use rapid_client::backend::HttpBackend;
use rapid_core::error::CoreError;
use rapid_core::input::{ModelInput, BASE_ASSET_MARKER};

use crate::error::RunAborted;
use crate::orchestrator::JobOrchestrator;

/// Totals of a batch that ran to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub inputs: usize,
    pub failures: usize,
}

/// Expand the model argument into the inputs to process.
///
/// A `<id>.id` token is a single base-asset reference. An existing
/// directory expands into its entries (not recursive), sorted by name.
/// Anything else is a single local file.
pub fn expand_worklist(model: &str) -> Result<Vec<ModelInput>, CoreError> {
    if model.ends_with(BASE_ASSET_MARKER) {
        tracing::info!("Running in base asset ID mode");
        return Ok(vec![ModelInput::classify(model)]);
    }

    let path = Path::new(model);
    if !path.is_dir() {
        tracing::info!("Running in single-file mode");
        return Ok(vec![ModelInput::LocalFile(path.to_path_buf())]);
    }

    tracing::info!(dir = %path.display(), "Running in directory mode");
    let mut entries = std::fs::read_dir(path)
        .map_err(|e| CoreError::io(path, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CoreError::io(path, e))?;
    entries.sort();

    Ok(entries
        .into_iter()
        .map(|p| ModelInput::classify(&p.to_string_lossy()))
        .collect())
}

/// Process every input of `model` in order.
///
/// An unreadable directory counts as one failure.
pub async fn run_batch<B: HttpBackend>(
    orchestrator: &mut JobOrchestrator<B>,
    model: &str,
) -> Result<BatchSummary, RunAborted> {
    let worklist = match expand_worklist(model) {
        Ok(worklist) => worklist,
        Err(e) => {
            tracing::error!(model, error = %e, "Cannot read model input");
            orchestrator.record_failure()?;
            Vec::new()
        }
    };

    for input in &worklist {
        orchestrator.process_input(input).await?;
    }

    Ok(BatchSummary {
        inputs: worklist.len(),
        failures: orchestrator.failures(),
    })
}
