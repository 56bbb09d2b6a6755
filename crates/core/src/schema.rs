//! JSON-schema validation of inline preset configurations.
//!
//! The schema file is supplied by the user through the settings file
//! (`schemaPath`) and compiled once per run.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::CoreError;

/// A compiled preset-configuration schema.
pub struct ConfigSchema {
    validator: jsonschema::Validator,
    path: PathBuf,
}

impl std::fmt::Debug for ConfigSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSchema")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ConfigSchema {
    /// Compile a schema from an in-memory JSON document.
    pub fn from_value(schema: &Value, origin: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = origin.into();
        let validator = jsonschema::validator_for(schema).map_err(|e| {
            CoreError::Config(format!(
                "Schema \"{}\" is not a valid JSON schema: {e}",
                path.display()
            ))
        })?;
        Ok(Self { validator, path })
    }

    /// Read and compile the schema file at `path`.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!(
                "Unable to validate configuration against schema: schema couldn't be read from file \"{}\": {e}",
                path.display()
            ))
        })?;
        let schema: Value = serde_json::from_str(&raw).map_err(|e| {
            CoreError::Config(format!(
                "Schema file \"{}\" is not valid JSON: {e}",
                path.display()
            ))
        })?;
        Self::from_value(&schema, path)
    }

    /// Path the schema was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate `config` against the schema.
    ///
    /// On failure the error message lists every violation, one per line,
    /// prefixed with the JSON pointer of the offending instance.
    pub fn validate(&self, config: &Value) -> Result<(), CoreError> {
        let violations: Vec<String> = self
            .validator
            .iter_errors(config)
            .map(|e| {
                let location = e.instance_path.to_string();
                if location.is_empty() {
                    e.to_string()
                } else {
                    format!("{location}: {e}")
                }
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Preset configuration is not valid:\n{}",
                violations.join("\n")
            )))
        }
    }
}
