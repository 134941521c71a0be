//! Model endpoint and inference settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One vision-language model served by an SGLang endpoint.
///
/// Identity is `name`; two configs with the same name refer to the same model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Display name, used in logs and in the `model_name` CSV column
    pub name: String,
    /// Model identifier sent as `model` in chat requests
    pub model_path: String,
    /// Server host
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    pub port: u16,
    /// Attention backend the server was launched with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attention_backend: Option<String>,
    /// Multimodal attention backend the server was launched with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mm_attention_backend: Option<String>,
    /// Whether the model takes part in runs
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Host used when a model entry names none.
pub fn default_host() -> String {
    "localhost".to_string()
}

fn default_enabled() -> bool {
    true
}

impl ModelConfig {
    /// Create an enabled model served on `localhost:port`.
    pub fn new(name: impl Into<String>, model_path: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            model_path: model_path.into(),
            host: default_host(),
            port,
            attention_backend: None,
            mm_attention_backend: None,
            enabled: true,
        }
    }

    /// Set the server host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set whether the model takes part in runs.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Base URL of the model server, e.g. `http://localhost:30000`.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// SGLang command line that serves this model with the configured backends.
    pub fn launch_command(&self) -> String {
        let mut cmd = format!(
            "python -m sglang.launch_server --model-path {} --host {} --port {}",
            self.model_path, self.host, self.port
        );
        if let Some(backend) = &self.attention_backend {
            cmd.push_str(" --attention-backend ");
            cmd.push_str(backend);
        }
        if let Some(backend) = &self.mm_attention_backend {
            cmd.push_str(" --mm-attention-backend ");
            cmd.push_str(backend);
        }
        cmd
    }
}

/// Sampling and timeout settings shared by every request of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceSettings {
    /// Maximum tokens in the generated response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,
    /// Per-request timeout in seconds
    #[serde(rename = "timeout", default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout_seconds() -> u64 {
    60
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl InferenceSettings {
    /// Per-request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
