//! Batch video inference across SGLang model servers.
//!
//! This crate provides:
//! - YAML configuration loading and validation
//! - Video discovery and URL resolution
//! - The sequential (video, model) inference loop
//! - Per-video CSV result files
//! - Tracing setup for the binaries

pub mod config;
pub mod csv_writer;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod prompt;
pub mod setup;

pub use config::{Directories, PipelineConfig};
pub use csv_writer::{ResultWriter, ResultsOverview, CSV_HEADER};
pub use discovery::{discover_videos, parse_base_url, VIDEO_EXTENSIONS};
pub use error::{ConfigError, PipelineError, PipelineResult};
pub use logging::{init_tracing, PairLogger};
pub use orchestrator::{Pipeline, PipelineOptions, RunPhase};
pub use prompt::{resolve_prompt, DEFAULT_PROMPT};
