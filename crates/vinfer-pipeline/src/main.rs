//! Video inference pipeline binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use vinfer_client::ClientConfig;
use vinfer_pipeline::{
    init_tracing, resolve_prompt, ConfigError, Pipeline, PipelineConfig, PipelineOptions,
};

/// Automated video inference on multiple vision-language models served by SGLang
#[derive(Parser, Debug)]
#[command(name = "vinfer")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "config/models.yaml")]
    config: PathBuf,

    /// Base URL for video hosting
    #[arg(long, default_value = "http://localhost:8000")]
    video_url_base: String,

    /// Logging level (DEBUG, INFO, WARNING, ERROR, CRITICAL)
    #[arg(long, default_value = "INFO")]
    log_level: String,

    /// Path to log file
    #[arg(long, default_value = "inference.log")]
    log_file: PathBuf,

    /// Log to the console only
    #[arg(long)]
    no_log_file: bool,

    /// Custom prompt for all videos
    #[arg(long)]
    custom_prompt: Option<String>,

    /// Health check timeout in seconds (default: $VINFER_HEALTH_TIMEOUT_SECS or 5)
    #[arg(long)]
    health_timeout: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Install rustls crypto provider (required for HTTPS model or video hosts)
    let _ = rustls::crypto::ring::default_provider().install_default();

    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_file = (!cli.no_log_file).then_some(cli.log_file.as_path());
    if let Err(e) = init_tracing(&cli.log_level, log_file) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let config = match PipelineConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e @ ConfigError::NotFound(_)) => {
            error!("{}", e);
            info!("Create a config file at the specified path or use --config to point at one");
            std::process::exit(1);
        }
        Err(e) => {
            error!("Fatal error: {}", e);
            std::process::exit(1);
        }
    };

    let health_timeout = cli
        .health_timeout
        .map(Duration::from_secs)
        .unwrap_or_else(ClientConfig::health_timeout_from_env);

    let options = PipelineOptions::default()
        .with_prompt(resolve_prompt(cli.custom_prompt.as_deref()))
        .with_video_url_base(cli.video_url_base)
        .with_health_timeout(health_timeout);

    let pipeline = match Pipeline::new(config, options) {
        Ok(p) => p,
        Err(e) => {
            error!("Fatal error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = pipeline.run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}
