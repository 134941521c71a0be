//! Pipeline configuration loaded from YAML.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};
use vinfer_models::{model::default_host, InferenceSettings, ModelConfig};

use crate::error::ConfigError;

/// Input and output directories.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Directories {
    /// Where the video files live
    pub videos: PathBuf,
    /// Where `*_results.csv` files are written
    pub results: PathBuf,
}

/// Validated pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Enabled models, in file order
    pub models: Vec<ModelConfig>,
    /// Names of disabled entries (`models[i]` when unnamed)
    pub disabled: Vec<String>,
    pub inference: InferenceSettings,
    pub directories: Directories,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    models: Option<Vec<RawModel>>,
    #[serde(default)]
    inference: Option<InferenceSettings>,
    #[serde(default)]
    directories: Option<Directories>,
}

/// Model entry as written; disabled entries may leave fields out.
#[derive(Debug, Deserialize)]
struct RawModel {
    name: Option<String>,
    model_path: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    attention_backend: Option<String>,
    mm_attention_backend: Option<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

fn required(
    value: Option<String>,
    index: usize,
    field: &'static str,
) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingField { index, field }),
    }
}

impl RawModel {
    fn into_model(self, index: usize) -> Result<ModelConfig, ConfigError> {
        let name = required(self.name, index, "name")?;
        let model_path = required(self.model_path, index, "model_path")?;
        let port = self.port.ok_or(ConfigError::MissingField {
            index,
            field: "port",
        })?;

        Ok(ModelConfig {
            name,
            model_path,
            host: self.host.unwrap_or_else(default_host),
            port,
            attention_backend: self.attention_backend,
            mm_attention_backend: self.mm_attention_backend,
            enabled: true,
        })
    }
}

impl PipelineConfig {
    /// Load and validate a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_yaml_str(&content, path)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Parse and validate YAML text; `source` names it in error messages.
    pub fn from_yaml_str(content: &str, source: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|source_err| ConfigError::Parse {
                path: source.as_ref().to_path_buf(),
                source: source_err,
            })?;

        let directories = raw
            .directories
            .ok_or_else(|| ConfigError::invalid("missing 'directories' section"))?;

        let mut models = Vec::new();
        let mut disabled = Vec::new();
        let mut seen = HashSet::new();

        for (index, entry) in raw.models.unwrap_or_default().into_iter().enumerate() {
            if !entry.enabled {
                disabled.push(entry.name.unwrap_or_else(|| format!("models[{}]", index)));
                continue;
            }

            let model = entry.into_model(index)?;
            if !seen.insert(model.name.clone()) {
                return Err(ConfigError::DuplicateModel(model.name));
            }
            models.push(model);
        }

        if models.is_empty() {
            warn!("No enabled models in configuration");
        }

        Ok(Self {
            models,
            disabled,
            inference: raw.inference.unwrap_or_default(),
            directories,
        })
    }

    /// Models that take part in runs, in file order.
    pub fn enabled_models(&self) -> &[ModelConfig] {
        &self.models
    }

    /// Names of models marked `enabled: false`.
    pub fn disabled_models(&self) -> &[String] {
        &self.disabled
    }
}
