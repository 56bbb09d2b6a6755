//! Artifact download to the local filesystem.

use std::path::Path;

use crate::backend::HttpBackend;
use crate::error::ApiError;
use crate::transport::Transport;

/// Download `url` to `output`, creating parent directories as needed.
///
/// Download URLs are presigned, so no auth headers are sent.
pub async fn download_file<B: HttpBackend>(
    transport: &Transport<B>,
    url: &str,
    output: &Path,
) -> Result<(), ApiError> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| ApiError::WriteOutput {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    tracing::info!(path = %output.display(), "Downloading");
    let data = transport.get_bytes(url).await?;

    tokio::fs::write(output, &data)
        .await
        .map_err(|source| ApiError::WriteOutput {
            path: output.to_path_buf(),
            source,
        })?;

    tracing::debug!(path = %output.display(), bytes = data.len(), "Download complete");
    Ok(())
}
