//! Sequential (video, model) inference loop.
//!
//! A run moves through `Init → HealthChecked → Discovering → Processing →
//! Summarizing → Done`. Every attempted pair produces exactly one
//! [`InferenceResult`], which is appended to the video's CSV file whether
//! the request succeeded or not.

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn, Instrument};
use url::Url;
use vinfer_client::{check_all, SglangClient};
use vinfer_models::{ExclusionReason, InferenceResult, ModelConfig, RunSummary, VideoRef};

use crate::config::PipelineConfig;
use crate::csv_writer::{ResultWriter, ResultsOverview};
use crate::discovery::{discover_videos, parse_base_url};
use crate::error::PipelineResult;
use crate::logging::PairLogger;
use crate::prompt::DEFAULT_PROMPT;

const BANNER: &str = "============================================================";

/// Run-time options that are not part of the config file.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Instruction sent with every video
    pub prompt: String,
    /// Base URL the video files are served from
    pub video_url_base: String,
    /// Timeout for each `/health` request
    pub health_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            video_url_base: "http://localhost:8000".to_string(),
            health_timeout: Duration::from_secs(5),
        }
    }
}

impl PipelineOptions {
    /// Set the instruction sent with every video.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Set the base URL videos are served from.
    pub fn with_video_url_base(mut self, base: impl Into<String>) -> Self {
        self.video_url_base = base.into();
        self
    }

    /// Set the timeout of each `/health` request.
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }
}

/// Stage of a pipeline run, logged at debug level on every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    HealthChecked,
    Discovering,
    Processing,
    Summarizing,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Init => "init",
            RunPhase::HealthChecked => "health_checked",
            RunPhase::Discovering => "discovering",
            RunPhase::Processing => "processing",
            RunPhase::Summarizing => "summarizing",
            RunPhase::Done => "done",
        };
        write!(f, "{}", name)
    }
}

struct ModelEndpoint {
    model: ModelConfig,
    client: SglangClient,
}

/// Drives one pipeline run.
pub struct Pipeline {
    config: PipelineConfig,
    options: PipelineOptions,
    base_url: Url,
    writer: ResultWriter,
    endpoints: Vec<ModelEndpoint>,
}

impl Pipeline {
    /// Validate options and prepare one client per enabled model.
    ///
    /// Creates the results directory. Fails on an invalid video URL base.
    pub fn new(config: PipelineConfig, options: PipelineOptions) -> PipelineResult<Self> {
        let base_url = parse_base_url(&options.video_url_base)?;
        let writer = ResultWriter::new(&config.directories.results)?;

        info!("Initializing {} model(s)...", config.models.len());
        let endpoints = config
            .models
            .iter()
            .map(|model| -> PipelineResult<ModelEndpoint> {
                let client = SglangClient::for_model(model, options.health_timeout)?;
                debug!("Client for {} at {}", model.name, client.base_url());
                Ok(ModelEndpoint {
                    model: model.clone(),
                    client,
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;
        info!("{} model client(s) initialized", endpoints.len());

        Ok(Self {
            config,
            options,
            base_url,
            writer,
            endpoints,
        })
    }

    /// Writer for this run's CSV files.
    pub fn writer(&self) -> &ResultWriter {
        &self.writer
    }

    /// Run every (video, healthy model) pair once and return the run summary.
    ///
    /// Only a missing or unreadable videos directory makes this fail; per-pair
    /// problems end up in the CSV files and the summary.
    pub async fn run(&self) -> PipelineResult<RunSummary> {
        let mut phase = RunPhase::Init;
        let mut summary = RunSummary::new();

        info!("{}", BANNER);
        info!("STARTING VIDEO INFERENCE PIPELINE");
        info!("{}", BANNER);

        for name in &self.config.disabled {
            info!("Model {} is disabled, skipping", name);
            summary.exclude(name.clone(), ExclusionReason::Disabled);
        }

        let report = check_all(
            self.endpoints
                .iter()
                .map(|ep| (ep.model.name.as_str(), &ep.client)),
        )
        .await;

        let mut active = Vec::new();
        for endpoint in &self.endpoints {
            let name = endpoint.model.name.as_str();
            match report.status(name) {
                Some(status) if status.is_healthy() => {
                    summary.add_model(name);
                    active.push(endpoint);
                }
                Some(status) => {
                    warn!("Excluding {} from this run: {}", name, status);
                    summary.exclude(name, ExclusionReason::Unreachable(status.to_string()));
                }
                None => {
                    summary.exclude(name, ExclusionReason::Unreachable("not checked".to_string()));
                }
            }
        }
        self.advance(&mut phase, RunPhase::HealthChecked);

        if active.is_empty() && !self.endpoints.is_empty() {
            warn!("No healthy model servers; no inference will be attempted");
        }

        self.advance(&mut phase, RunPhase::Discovering);
        let videos = discover_videos(&self.config.directories.videos, &self.base_url).await?;
        summary.video_count = videos.len();

        if videos.is_empty() {
            error!(
                "No video files found in {}",
                self.config.directories.videos.display()
            );
            self.advance(&mut phase, RunPhase::Summarizing);
            self.log_summary(&summary);
            self.advance(&mut phase, RunPhase::Done);
            return Ok(summary);
        }

        self.advance(&mut phase, RunPhase::Processing);
        let total = videos.len();
        for (idx, video) in videos.iter().enumerate() {
            info!("[{}/{}]", idx + 1, total);
            info!("{}", BANNER);
            info!("Processing video: {}", video.filename);
            info!("{}", BANNER);

            for endpoint in &active {
                self.process_pair(video, endpoint, &mut summary).await;
            }
        }

        self.advance(&mut phase, RunPhase::Summarizing);
        self.log_summary(&summary);
        self.advance(&mut phase, RunPhase::Done);
        Ok(summary)
    }

    /// Invoke one model on one video and record the outcome.
    async fn process_pair(
        &self,
        video: &VideoRef,
        endpoint: &ModelEndpoint,
        summary: &mut RunSummary,
    ) {
        let model = &endpoint.model;
        let logger = PairLogger::new(&video.filename, &model.name);
        let span = logger.create_span();

        async {
            logger.log_start();

            let started = Instant::now();
            let outcome = endpoint
                .client
                .infer_video(&video.resolved_url, &self.options.prompt, &self.config.inference)
                .await;
            let latency = started.elapsed();

            let result = match outcome {
                Ok(text) => {
                    logger.log_success(latency);
                    InferenceResult::success(&video.filename, &model.name, &model.model_path, text)
                }
                Err(e) => {
                    let message = e.to_string();
                    logger.log_failure(latency, &message);
                    InferenceResult::failure(
                        &video.filename,
                        &model.name,
                        &model.model_path,
                        message,
                    )
                }
            };

            if let Err(e) = self.writer.append(&result) {
                logger.log_write_failure(&e.to_string());
                summary.record_write_failure();
            }
            summary.record(&result, latency);
        }
        .instrument(span)
        .await
    }

    fn advance(&self, phase: &mut RunPhase, next: RunPhase) {
        debug!(from = %phase, to = %next, "Pipeline phase change");
        *phase = next;
    }

    fn log_summary(&self, summary: &RunSummary) {
        info!("{}", BANNER);
        info!("INFERENCE SUMMARY");
        info!("{}", BANNER);
        info!(
            "Videos: {}  Models: {}  Results: {}",
            summary.video_count, summary.model_count, summary.result_count
        );

        for tally in &summary.tallies {
            info!(
                "  {}: {} success, {} error, mean latency {:.2}s",
                tally.model_name,
                tally.successes,
                tally.failures,
                tally.mean_latency().as_secs_f64()
            );
        }
        for excluded in &summary.excluded {
            info!("  {}: excluded ({})", excluded.name, excluded.reason);
        }
        log_outcomes(summary);
        if summary.write_failures > 0 {
            warn!("{} result(s) could not be written to CSV", summary.write_failures);
        }

        match self.writer.summarize() {
            Ok(overview) => log_overview(&overview, self.writer.results_dir()),
            Err(e) => error!("Could not summarize results directory: {}", e),
        }

        info!("{}", BANNER);
        info!("PIPELINE COMPLETED");
        info!("{}", BANNER);
    }
}

fn log_outcomes(summary: &RunSummary) {
    let by_video = summary.outcomes_by_video();
    if by_video.is_empty() {
        return;
    }

    info!("Results by video:");
    for (video, outcomes) in by_video {
        info!("  {}:", video);
        for outcome in outcomes {
            info!("    {}: {}", outcome.model_name, outcome.status);
        }
    }
}

fn log_overview(overview: &ResultsOverview, results_dir: &Path) {
    info!("Results saved:");
    info!("  Total CSV files: {}", overview.files.len());
    info!("  Total results: {}", overview.total_rows);
    info!("  Output directory: {}", results_dir.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Directories;
    use serde_json::json;
    use tempfile::TempDir;
    use vinfer_models::{InferenceSettings, InferenceStatus};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn healthy_server(content: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": content}}]
            })))
            .mount(&server)
            .await;
        server
    }

    fn model_for(name: &str, server: &MockServer) -> ModelConfig {
        let addr = server.address();
        ModelConfig::new(name, format!("org/{}", name), addr.port())
            .with_host(addr.ip().to_string())
    }

    fn config(dir: &TempDir, models: Vec<ModelConfig>, disabled: Vec<String>) -> PipelineConfig {
        let videos = dir.path().join("videos");
        std::fs::create_dir_all(&videos).unwrap();
        PipelineConfig {
            models,
            disabled,
            inference: InferenceSettings {
                timeout_seconds: 5,
                ..Default::default()
            },
            directories: Directories {
                videos,
                results: dir.path().join("results"),
            },
        }
    }

    fn add_videos(dir: &TempDir, names: &[&str]) {
        for name in names {
            std::fs::write(dir.path().join("videos").join(name), b"fake video").unwrap();
        }
    }

    #[test]
    fn test_invalid_base_url_is_fatal() {
        let dir = TempDir::new().unwrap();
        let options = PipelineOptions::default().with_video_url_base("localhost:8000");
        let err = Pipeline::new(config(&dir, vec![], vec![]), options)
            .err()
            .unwrap();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_zero_videos_terminates_early() {
        let dir = TempDir::new().unwrap();
        let server = healthy_server("unused").await;
        let cfg = config(&dir, vec![model_for("m", &server)], vec![]);

        let summary = Pipeline::new(cfg, PipelineOptions::default())
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(summary.video_count, 0);
        assert_eq!(summary.result_count, 0);
        assert_eq!(summary.model_count, 1);
    }

    #[tokio::test]
    async fn test_custom_prompt_is_sent() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(wiremock::matchers::body_partial_json(json!({
                "messages": [{"role": "user", "content": [
                    {"type": "text", "text": "Describe the scene."},
                    {"type": "video_url", "video_url": {"url": "http://videos.local:8000/a.mp4"}}
                ]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "A corridor."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = config(&dir, vec![model_for("m", &server)], vec![]);
        add_videos(&dir, &["a.mp4"]);

        let options = PipelineOptions::default()
            .with_prompt("Describe the scene.")
            .with_video_url_base("http://videos.local:8000");
        let summary = Pipeline::new(cfg, options).unwrap().run().await.unwrap();

        assert_eq!(summary.total_successes(), 1);
    }

    #[tokio::test]
    async fn test_server_error_recorded_and_run_continues() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .expect(2)
            .mount(&server)
            .await;

        let cfg = config(&dir, vec![model_for("m", &server)], vec![]);
        add_videos(&dir, &["a.mp4", "b.mp4"]);

        let pipeline = Pipeline::new(cfg, PipelineOptions::default()).unwrap();
        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.result_count, 2);
        assert_eq!(summary.tally("m").unwrap().failures, 2);

        let mut reader =
            csv::Reader::from_path(pipeline.writer().csv_path("a.mp4")).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0][4].parse::<InferenceStatus>().unwrap(),
            InferenceStatus::Error
        );
        assert_eq!(&rows[0][5], "");
        assert!(rows[0][6].contains("500"));
    }

    #[tokio::test]
    async fn test_csv_write_failure_counted_and_run_continues() {
        let dir = TempDir::new().unwrap();
        let server = healthy_server("Final Count: 4").await;
        let cfg = config(&dir, vec![model_for("m", &server)], vec![]);
        add_videos(&dir, &["a.mp4", "b.mp4"]);

        let pipeline = Pipeline::new(cfg, PipelineOptions::default()).unwrap();
        // A directory where a.mp4's CSV file belongs makes the append fail
        std::fs::create_dir(pipeline.writer().csv_path("a.mp4")).unwrap();

        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.write_failures, 1);
        assert_eq!(summary.result_count, 2);
        assert_eq!(summary.tally("m").unwrap().successes, 2);

        let mut reader =
            csv::Reader::from_path(pipeline.writer().csv_path("b.mp4")).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1], "b.mp4");
        assert_eq!(&rows[0][5], "Final Count: 4");
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(RunPhase::HealthChecked.to_string(), "health_checked");
        assert_eq!(RunPhase::Done.to_string(), "done");
    }
}
