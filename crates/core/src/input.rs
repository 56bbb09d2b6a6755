//! Classification of model inputs.
//!
//! An input is either a local file to upload or a reference to an asset
//! already on the server, written as `<id>.id`.

use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::types::AssetId;

/// Suffix marking a base-asset reference instead of a file path.
pub const BASE_ASSET_MARKER: &str = ".id";

/// One unit of work for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelInput {
    /// A local model file to upload.
    LocalFile(PathBuf),
    /// A `<id>.id` token referring to an existing base asset. The token is
    /// kept verbatim; it is parsed (and may fail) when processed.
    BaseAsset(String),
}

impl ModelInput {
    /// Classify a single path or token.
    pub fn classify(raw: &str) -> Self {
        if raw.ends_with(BASE_ASSET_MARKER) {
            Self::BaseAsset(raw.to_string())
        } else {
            Self::LocalFile(PathBuf::from(raw))
        }
    }

    pub fn is_base_asset(&self) -> bool {
        matches!(self, Self::BaseAsset(_))
    }
}

impl std::fmt::Display for ModelInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LocalFile(path) => write!(f, "{}", path.display()),
            Self::BaseAsset(token) => f.write_str(token),
        }
    }
}

/// Parse the asset ID out of a `<id>.id` token.
///
/// Only the final path component is considered, so `refs/42.id` yields 42.
pub fn parse_base_asset_id(token: &str) -> Result<AssetId, CoreError> {
    let stem = token
        .strip_suffix(BASE_ASSET_MARKER)
        .ok_or_else(|| CoreError::InvalidAssetToken(token.to_string()))?;
    let number = stem.rsplit(&['/', '\\'][..]).next().unwrap_or(stem);
    number
        .trim()
        .parse::<AssetId>()
        .map_err(|_| CoreError::InvalidAssetToken(token.to_string()))
}

/// Model name derived from a local file: the file name without its last
/// extension.
pub fn model_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Last extension of a local file including the dot, e.g. `.glb`, or an
/// empty string when there is none.
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Check that a local model path names an existing regular file.
pub fn ensure_model_file(path: &Path) -> Result<(), CoreError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Model file \"{}\" does not exist or is not a regular file",
            path.display()
        )))
    }
}
