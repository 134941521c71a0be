//! Shared data models for the video inference pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Model endpoints and inference settings
//! - Video references
//! - Per-pair inference results
//! - Run summaries

pub mod model;
pub mod result;
pub mod summary;
pub mod video;

// Re-export common types
pub use model::{InferenceSettings, ModelConfig};
pub use result::{InferenceResult, InferenceStatus, ParseStatusError};
pub use summary::{ExcludedModel, ExclusionReason, ModelTally, PairOutcome, RunSummary};
pub use video::VideoRef;
