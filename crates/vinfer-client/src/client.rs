//! SGLang server HTTP client.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};
use vinfer_models::{InferenceSettings, ModelConfig};

use crate::error::{error_chain, ClientError, ClientResult};
use crate::health::HealthStatus;
use crate::types::{ChatRequest, ChatResponse};

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
const HEALTH_PATH: &str = "/health";

/// Configuration for one model endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the server, e.g. `http://localhost:30000`
    pub base_url: String,
    /// Model identifier sent with every request
    pub model_path: String,
    /// Timeout for `/health`, independent of the inference timeout
    pub health_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:30000".to_string(),
            model_path: String::new(),
            health_timeout: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    /// Config pointing at the server of `model`.
    pub fn for_model(model: &ModelConfig) -> Self {
        Self {
            base_url: model.base_url(),
            model_path: model.model_path.clone(),
            ..Default::default()
        }
    }

    /// Set the `/health` timeout.
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Health timeout from `VINFER_HEALTH_TIMEOUT_SECS`, defaulting to 5 seconds.
    pub fn health_timeout_from_env() -> Duration {
        Duration::from_secs(
            std::env::var("VINFER_HEALTH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        )
    }
}

/// Client for one SGLang server.
pub struct SglangClient {
    http: Client,
    config: ClientConfig,
}

impl SglangClient {
    /// Create a client for one server.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = Client::builder().build()?;
        Ok(Self { http, config })
    }

    /// Client for the server of `model`.
    pub fn for_model(model: &ModelConfig, health_timeout: Duration) -> ClientResult<Self> {
        Self::new(ClientConfig::for_model(model).with_health_timeout(health_timeout))
    }

    /// Base URL of the server.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Check `GET /health`. Never fails; problems are folded into the status.
    pub async fn health_check(&self) -> HealthStatus {
        let url = format!("{}{}", self.config.base_url, HEALTH_PATH);

        match self
            .http
            .get(&url)
            .timeout(self.config.health_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().as_u16() == 200 => {
                info!("Server at {} is healthy", self.config.base_url);
                HealthStatus::Healthy
            }
            Ok(response) => {
                let status = response.status().as_u16();
                warn!(
                    "Server at {} returned status {}",
                    self.config.base_url, status
                );
                HealthStatus::Unhealthy(status)
            }
            Err(e) => {
                let detail = if e.is_timeout() {
                    format!(
                        "health check timed out after {}s",
                        self.config.health_timeout.as_secs_f32()
                    )
                } else {
                    error_chain(&e)
                };
                warn!("Cannot reach server at {}: {}", self.config.base_url, detail);
                HealthStatus::Unreachable(detail)
            }
        }
    }

    /// Send one chat completion request for a video and return the generated text.
    ///
    /// Exactly one POST is made; there are no retries.
    pub async fn infer_video(
        &self,
        video_url: &str,
        prompt: &str,
        settings: &InferenceSettings,
    ) -> ClientResult<String> {
        let url = format!("{}{}", self.config.base_url, CHAT_COMPLETIONS_PATH);
        let request = ChatRequest::video(&self.config.model_path, prompt, video_url, settings);
        let timeout_secs = settings.timeout_seconds;

        debug!("Sending request to {}", url);

        let response = self
            .http
            .post(&url)
            .timeout(settings.timeout())
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::from_transport(e, timeout_secs))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::from_transport(e, timeout_secs))?;

        if !status.is_success() {
            return Err(ClientError::status(status.as_u16(), &body));
        }

        let chat: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            ClientError::invalid_response(format!("failed to parse response body: {}", e))
        })?;

        match chat.first_content() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            Some(_) => Err(ClientError::invalid_response("model returned empty content")),
            None => Err(ClientError::invalid_response("response contained no choices")),
        }
    }
}
