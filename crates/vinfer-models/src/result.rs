//! Per-pair inference outcomes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of one (video, model) attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceStatus {
    Success,
    Error,
}

impl InferenceStatus {
    /// Value written to the `status` CSV column.
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceStatus::Success => "success",
            InferenceStatus::Error => "error",
        }
    }
}

impl fmt::Display for InferenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returned when a string is neither `success` nor `error`.
#[derive(Debug, Error)]
#[error("Invalid inference status: {0}")]
pub struct ParseStatusError(String);

impl FromStr for InferenceStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(InferenceStatus::Success),
            "error" => Ok(InferenceStatus::Error),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// One CSV row worth of outcome for a (video, model) pair.
///
/// A success never carries an error message and a failure never carries
/// response text; use [`InferenceResult::success`] and
/// [`InferenceResult::failure`] to build them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub timestamp: DateTime<Local>,
    pub video_name: String,
    pub model_name: String,
    pub model_path: String,
    pub status: InferenceStatus,
    pub response_text: String,
    pub error_message: String,
}

impl InferenceResult {
    /// Successful result stamped with the current local time.
    pub fn success(
        video_name: impl Into<String>,
        model_name: impl Into<String>,
        model_path: impl Into<String>,
        response_text: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            video_name: video_name.into(),
            model_name: model_name.into(),
            model_path: model_path.into(),
            status: InferenceStatus::Success,
            response_text: response_text.into(),
            error_message: String::new(),
        }
    }

    /// Failed result; a blank message becomes `unknown error`.
    pub fn failure(
        video_name: impl Into<String>,
        model_name: impl Into<String>,
        model_path: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        let mut error_message = error_message.into();
        if error_message.trim().is_empty() {
            error_message = "unknown error".to_string();
        }

        Self {
            timestamp: Local::now(),
            video_name: video_name.into(),
            model_name: model_name.into(),
            model_path: model_path.into(),
            status: InferenceStatus::Error,
            response_text: String::new(),
            error_message,
        }
    }

    /// True for [`InferenceStatus::Success`].
    pub fn is_success(&self) -> bool {
        self.status == InferenceStatus::Success
    }

    /// RFC 3339 timestamp with microseconds, as written to CSV.
    pub fn timestamp_string(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, false)
    }
}
