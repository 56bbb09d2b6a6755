use rapid_client::error::ApiError;
use rapid_core::error::CoreError;

/// A failure that ends processing of one input or one preset.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// The run was stopped early because exit-on-error is set.
#[derive(Debug, thiserror::Error)]
#[error("Stopping after {failures} failure(s) because exit on error is set")]
pub struct RunAborted {
    pub failures: usize,
}
