//! Loading and validation of the JSON configuration files.
//!
//! Three files are read before any network call is made:
//!
//! | File        | Required content                                   |
//! |-------------|----------------------------------------------------|
//! | credentials | `{"token": "<non-empty string>"}`                  |
//! | settings    | `{"schemaPath": "<existing JSON schema file>"}`    |
//! | presets     | `{"presets": {<name>: {preset_id | config}, ...}}` |
//!
//! Every failure here is a [`CoreError::Config`] and is fatal for the run.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::preset::PresetsFile;

/// API credentials. Immutable for the lifetime of the process.
#[derive(Clone)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Result<Self, CoreError> {
        let token = token.into();
        if token.is_empty() {
            return Err(CoreError::Config(
                "Field \"token\" cannot be empty in credentials file.".to_string(),
            ));
        }
        Ok(Self { token })
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("token", &"***").finish()
    }
}

/// Run settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(rename = "schemaPath")]
    pub schema_path: PathBuf,
}

fn read_text(path: &Path, what: &str) -> Result<String, CoreError> {
    std::fs::read_to_string(path).map_err(|e| {
        CoreError::Config(format!(
            "Unable to load {what} file \"{}\": {e}. Make sure the file exists and is valid JSON.",
            path.display()
        ))
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(
    raw: &str,
    path: &Path,
    what: &str,
) -> Result<T, CoreError> {
    serde_json::from_str(raw).map_err(|e| {
        CoreError::Config(format!(
            "Unable to parse {what} file \"{}\": {e}. Make sure the file is valid JSON.",
            path.display()
        ))
    })
}

fn read_json(path: &Path, what: &str) -> Result<Value, CoreError> {
    parse_json(&read_text(path, what)?, path, what)
}

/// Validate a parsed credentials document.
pub fn parse_credentials(doc: &Value) -> Result<Credentials, CoreError> {
    let token = doc.get("token").ok_or_else(|| {
        CoreError::Config("Required field \"token\" missing in credentials file.".to_string())
    })?;
    let token = token.as_str().ok_or_else(|| {
        CoreError::Config("Field \"token\" must be a string in credentials file.".to_string())
    })?;
    Credentials::new(token)
}

/// Validate a parsed settings document, including that the schema exists.
pub fn parse_settings(doc: &Value) -> Result<Settings, CoreError> {
    if doc.get("schemaPath").is_none() {
        return Err(CoreError::Config(
            "Required field \"schemaPath\" missing in settings file.".to_string(),
        ));
    }
    let settings: Settings = serde_json::from_value(doc.clone()).map_err(|e| {
        CoreError::Config(format!("Invalid settings file: {e}"))
    })?;
    if !settings.schema_path.exists() {
        return Err(CoreError::Config(format!(
            "Schema file \"{}\" does not exist.",
            settings.schema_path.display()
        )));
    }
    Ok(settings)
}

/// Validate the top-level structure of a presets document.
pub fn parse_presets_file(doc: &Value) -> Result<PresetsFile, CoreError> {
    match doc.get("presets") {
        Some(Value::Object(_)) => {}
        Some(_) => {
            return Err(CoreError::Config(
                "Field \"presets\" must be an object in presets file.".to_string(),
            ))
        }
        None => {
            return Err(CoreError::Config(
                "Required field \"presets\" missing in presets file.".to_string(),
            ))
        }
    }
    serde_json::from_value(doc.clone())
        .map_err(|e| CoreError::Config(format!("Invalid presets file: {e}")))
}

pub fn load_credentials(path: &Path) -> Result<Credentials, CoreError> {
    parse_credentials(&read_json(path, "credentials JSON")?)
}

pub fn load_settings(path: &Path) -> Result<Settings, CoreError> {
    parse_settings(&read_json(path, "settings JSON")?)
}

/// Load the presets file.
///
/// Deserialized from the raw text rather than via [`Value`] so that
/// preset order matches the file.
pub fn load_presets_file(path: &Path) -> Result<PresetsFile, CoreError> {
    const WHAT: &str = "preset definitions JSON";
    let raw = read_text(path, WHAT)?;
    parse_presets_file(&parse_json(&raw, path, WHAT)?)?;
    parse_json(&raw, path, WHAT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn credentials_require_token() {
        let err = parse_credentials(&json!({})).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn credentials_token_must_be_string() {
        let err = parse_credentials(&json!({ "token": 12 })).unwrap_err();
        assert!(err.to_string().contains("must be a string"));
    }

    #[test]
    fn credentials_token_must_not_be_empty() {
        let err = parse_credentials(&json!({ "token": "" })).unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn credentials_debug_hides_token() {
        let c = parse_credentials(&json!({ "token": "secret-value" })).unwrap();
        assert_eq!(c.token(), "secret-value");
        assert!(!format!("{c:?}").contains("secret-value"));
    }

    #[test]
    fn settings_require_schema_path() {
        assert_matches!(parse_settings(&json!({})), Err(CoreError::Config(_)));
    }

    #[test]
    fn settings_schema_must_exist() {
        let err = parse_settings(&json!({ "schemaPath": "/nonexistent/schema.json" })).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn settings_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let schema = dir.path().join("schema.json");
        std::fs::write(&schema, "{}").unwrap();
        let settings_path = dir.path().join("settings.json");
        std::fs::write(
            &settings_path,
            serde_json::to_string(&json!({ "schemaPath": schema })).unwrap(),
        )
        .unwrap();

        let settings = load_settings(&settings_path).unwrap();
        assert_eq!(settings.schema_path, schema);
    }

    #[test]
    fn presets_require_presets_object() {
        assert_matches!(parse_presets_file(&json!({})), Err(CoreError::Config(_)));
        assert_matches!(
            parse_presets_file(&json!({ "presets": [] })),
            Err(CoreError::Config(_))
        );
    }

    #[test]
    fn presets_load_preserves_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");
        std::fs::write(
            &path,
            r#"{"presets": {"web": {"preset_id": 2}, "ar": {"preset_id": 1}}}"#,
        )
        .unwrap();

        let file = load_presets_file(&path).unwrap();
        let names: Vec<&String> = file.presets.keys().collect();
        assert_eq!(names, vec!["web", "ar"]);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = load_credentials(Path::new("/nonexistent/credentials.json")).unwrap_err();
        assert_matches!(err, CoreError::Config(_));
        assert!(err.to_string().contains("Make sure the file exists"));
    }

    #[test]
    fn malformed_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_matches!(load_credentials(&path), Err(CoreError::Config(_)));
    }
}
