//! Optimization preset definitions and validation.
//!
//! A preset is either a reference to a preset stored on the server
//! (`{"preset_id": 12}`) or an inline configuration
//! (`{"config": {...}}`). The two forms are mutually exclusive.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::schema::ConfigSchema;

/// Key selecting a server-stored preset.
pub const PRESET_ID_KEY: &str = "preset_id";

/// Key holding an inline preset configuration.
pub const CONFIG_KEY: &str = "config";

/// A single validated preset, serialized verbatim as the optimize request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Preset {
    Id { preset_id: i64 },
    Config { config: Value },
}

/// Top-level shape of the presets file.
#[derive(Debug, Clone, Deserialize)]
pub struct PresetsFile {
    pub presets: IndexMap<String, Value>,
}

/// Validated presets in file order.
#[derive(Debug, Clone, Default)]
pub struct PresetSet {
    entries: IndexMap<String, Preset>,
}

impl PresetSet {
    pub fn insert(&mut self, name: impl Into<String>, preset: Preset) {
        self.entries.insert(name.into(), preset);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Preset)> {
        self.entries.iter().map(|(name, preset)| (name.as_str(), preset))
    }

    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Preset)> for PresetSet {
    fn from_iter<T: IntoIterator<Item = (String, Preset)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Check that a raw preset has exactly one of `preset_id` / `config`.
///
/// Does not consult the schema; see [`validate_presets`].
pub fn parse_preset_shape(name: &str, raw: &Value) -> Result<Preset, CoreError> {
    let obj = raw.as_object().ok_or_else(|| {
        CoreError::Validation(format!("Error in preset \"{name}\": preset must be a JSON object."))
    })?;

    match (obj.get(PRESET_ID_KEY), obj.get(CONFIG_KEY)) {
        (Some(_), Some(_)) => Err(CoreError::Validation(format!(
            "Error in preset \"{name}\": Cannot specify both \"{PRESET_ID_KEY}\" and \"{CONFIG_KEY}\". \
             Please use either \"{PRESET_ID_KEY}\" OR \"{CONFIG_KEY}\", but not both."
        ))),
        (None, None) => Err(CoreError::Validation(format!(
            "Error in preset \"{name}\": Must specify either \"{PRESET_ID_KEY}\" or \"{CONFIG_KEY}\"."
        ))),
        (Some(id), None) => id
            .as_i64()
            .map(|preset_id| Preset::Id { preset_id })
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Error in preset \"{name}\": \"{PRESET_ID_KEY}\" must be an integer, got {id}."
                ))
            }),
        (None, Some(config)) => Ok(Preset::Config {
            config: config.clone(),
        }),
    }
}

/// Validate every preset in `file` and keep the ones that pass.
///
/// `config` presets are checked against `schema`; when no schema could be
/// loaded they are all rejected. `preset_id` presets need no schema.
/// Fails only when no preset at all survives.
pub fn validate_presets(
    file: &PresetsFile,
    schema: Option<&ConfigSchema>,
) -> Result<PresetSet, CoreError> {
    tracing::info!(count = file.presets.len(), "Validating preset configurations");

    let mut valid = PresetSet::default();

    for (name, raw) in &file.presets {
        let preset = match parse_preset_shape(name, raw) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(preset = %name, "{e}");
                continue;
            }
        };

        match &preset {
            Preset::Config { config } => {
                let Some(schema) = schema else {
                    tracing::error!(
                        preset = %name,
                        "No schema available, cannot validate preset configuration"
                    );
                    continue;
                };
                match schema.validate(config) {
                    Ok(()) => {
                        tracing::info!(preset = %name, "Preset configuration passed validation");
                    }
                    Err(e) => {
                        tracing::error!(preset = %name, "{e}");
                        continue;
                    }
                }
            }
            Preset::Id { preset_id } => {
                tracing::info!(preset = %name, preset_id, "Preset uses preset_id");
            }
        }

        valid.insert(name.clone(), preset);
    }

    if valid.is_empty() {
        return Err(CoreError::Validation(
            "No valid preset configuration found".to_string(),
        ));
    }

    Ok(valid)
}
