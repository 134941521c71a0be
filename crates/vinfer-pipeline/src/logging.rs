//! Tracing setup and structured per-pair logging.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use tracing::level_filters::LevelFilter;
use tracing::{error, info, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

use crate::error::{PipelineError, PipelineResult};

/// Map a CLI level name to a filter.
///
/// Accepts the tracing names plus `WARNING` and `CRITICAL`, case-insensitively.
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_uppercase().as_str() {
        "TRACE" => Some(LevelFilter::TRACE),
        "DEBUG" => Some(LevelFilter::DEBUG),
        "INFO" => Some(LevelFilter::INFO),
        "WARN" | "WARNING" => Some(LevelFilter::WARN),
        "ERROR" | "CRITICAL" => Some(LevelFilter::ERROR),
        "OFF" => Some(LevelFilter::OFF),
        _ => None,
    }
}

/// Install the global subscriber: console output plus an optional log file.
///
/// `RUST_LOG` takes precedence over `level`. `LOG_FORMAT=json` switches the
/// console layer to JSON; the file layer is always plain text.
pub fn init_tracing(level: &str, log_file: Option<&Path>) -> PipelineResult<()> {
    let level = parse_level(level)
        .ok_or_else(|| PipelineError::logging(format!("unknown log level '{}'", level)))?;

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::default()
            .add_directive(level.into())
            .add_directive(quiet_directive("hyper=warn")?)
            .add_directive(quiet_directive("reqwest=warn")?),
    };

    let console = if use_json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer()
            .with_ansi(true)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed()
    };

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| PipelineError::logging(e.to_string()))
}

fn quiet_directive(directive: &str) -> PipelineResult<tracing_subscriber::filter::Directive> {
    directive
        .parse()
        .map_err(|e| PipelineError::logging(format!("bad filter directive '{}': {}", directive, e)))
}

/// Logger for one (video, model) pair.
///
/// Every event carries the video and model names as structured fields.
#[derive(Debug, Clone)]
pub struct PairLogger {
    video: String,
    model: String,
}

impl PairLogger {
    /// Create a logger for `model` processing `video`.
    pub fn new(video: &str, model: &str) -> Self {
        Self {
            video: video.to_string(),
            model: model.to_string(),
        }
    }

    /// Log that the request is about to be sent.
    pub fn log_start(&self) {
        info!(
            video = %self.video,
            model = %self.model,
            "Running inference with {}", self.model
        );
    }

    /// Log a successful response and its latency.
    pub fn log_success(&self, latency: Duration) {
        info!(
            video = %self.video,
            model = %self.model,
            latency_ms = latency.as_millis() as u64,
            "{} completed successfully in {:.2}s", self.model, latency.as_secs_f64()
        );
    }

    /// Log a failed request with its latency and error message.
    pub fn log_failure(&self, latency: Duration, message: &str) {
        error!(
            video = %self.video,
            model = %self.model,
            latency_ms = latency.as_millis() as u64,
            "{} failed after {:.2}s: {}", self.model, latency.as_secs_f64(), message
        );
    }

    /// Log a result that could not be appended to its CSV file.
    pub fn log_write_failure(&self, message: &str) {
        error!(
            video = %self.video,
            model = %self.model,
            "Failed to write result to CSV: {}", message
        );
    }

    pub fn video(&self) -> &str {
        &self.video
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Span wrapping the request and the CSV append for this pair.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("pair", video = %self.video, model = %self.model)
    }
}
