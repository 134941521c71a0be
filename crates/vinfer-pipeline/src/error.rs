//! Pipeline error types.

use std::path::PathBuf;

use thiserror::Error;
use vinfer_client::ClientError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Problems with the configuration file. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing YAML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Model entry {index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("Duplicate model name: {0}")]
    DuplicateModel(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Configuration that parses but cannot be used.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Errors raised while running the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot read videos directory {path}: {source}")]
    VideosDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid video URL base '{0}'")]
    InvalidBaseUrl(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Logging could not be initialized.
    pub fn logging(msg: impl Into<String>) -> Self {
        Self::Logging(msg.into())
    }

    /// Setup failures that abort the run before or during discovery.
    ///
    /// Per-pair failures (client, CSV, IO) are recorded and never fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::Config(_)
                | PipelineError::VideosDir { .. }
                | PipelineError::InvalidBaseUrl(_)
                | PipelineError::Logging(_)
        )
    }
}
