//! Run-level counters.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::result::{InferenceResult, InferenceStatus};

/// Why a configured model took no part in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum ExclusionReason {
    /// `enabled: false` in the config file
    Disabled,
    /// Health check failed; carries the failure description
    Unreachable(String),
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::Disabled => write!(f, "disabled"),
            ExclusionReason::Unreachable(detail) => write!(f, "unreachable ({})", detail),
        }
    }
}

/// A model left out of a run, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedModel {
    pub name: String,
    pub reason: ExclusionReason,
}

/// Per-model outcome counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTally {
    pub model_name: String,
    pub successes: usize,
    pub failures: usize,
    /// Sum of request latencies in milliseconds
    pub total_latency_ms: u64,
}

/// Outcome of one (video, model) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairOutcome {
    pub video_name: String,
    pub model_name: String,
    pub status: InferenceStatus,
}

impl ModelTally {
    /// Successes plus failures.
    pub fn attempts(&self) -> usize {
        self.successes + self.failures
    }

    /// Mean request latency, or zero when nothing was attempted.
    pub fn mean_latency(&self) -> Duration {
        match self.attempts() {
            0 => Duration::ZERO,
            n => Duration::from_millis(self.total_latency_ms / n as u64),
        }
    }
}

/// Counters accumulated over one pipeline invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub video_count: usize,
    /// Models that were healthy and took part in the run
    pub model_count: usize,
    pub result_count: usize,
    /// Tallies in config order
    pub tallies: Vec<ModelTally>,
    pub excluded: Vec<ExcludedModel>,
    /// Results that could not be appended to their CSV file
    pub write_failures: usize,
    /// Every attempted pair, in processing order
    pub outcomes: Vec<PairOutcome>,
}

impl RunSummary {
    /// Empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model that will be invoked, so it shows up even with zero videos.
    pub fn add_model(&mut self, model_name: &str) {
        if self.tally(model_name).is_none() {
            self.tallies.push(ModelTally {
                model_name: model_name.to_string(),
                ..Default::default()
            });
            self.model_count = self.tallies.len();
        }
    }

    /// Record a model that takes no part in the run.
    pub fn exclude(&mut self, name: impl Into<String>, reason: ExclusionReason) {
        self.excluded.push(ExcludedModel {
            name: name.into(),
            reason,
        });
    }

    /// Count one attempted pair.
    pub fn record(&mut self, result: &InferenceResult, latency: Duration) {
        self.add_model(&result.model_name);
        self.result_count += 1;
        self.outcomes.push(PairOutcome {
            video_name: result.video_name.clone(),
            model_name: result.model_name.clone(),
            status: result.status,
        });

        if let Some(tally) = self
            .tallies
            .iter_mut()
            .find(|t| t.model_name == result.model_name)
        {
            if result.is_success() {
                tally.successes += 1;
            } else {
                tally.failures += 1;
            }
            tally.total_latency_ms += latency.as_millis() as u64;
        }
    }

    /// Count a result that could not be written.
    pub fn record_write_failure(&mut self) {
        self.write_failures += 1;
    }

    /// Tally for a model, if it took part.
    pub fn tally(&self, model_name: &str) -> Option<&ModelTally> {
        self.tallies.iter().find(|t| t.model_name == model_name)
    }

    /// Successful pairs across all models.
    pub fn total_successes(&self) -> usize {
        self.tallies.iter().map(|t| t.successes).sum()
    }

    /// Failed pairs across all models.
    pub fn total_failures(&self) -> usize {
        self.tallies.iter().map(|t| t.failures).sum()
    }

    /// Names of models excluded because they are disabled.
    pub fn disabled_models(&self) -> impl Iterator<Item = &str> {
        self.excluded
            .iter()
            .filter(|e| e.reason == ExclusionReason::Disabled)
            .map(|e| e.name.as_str())
    }

    /// Names of models excluded because their health check failed.
    pub fn unreachable_models(&self) -> impl Iterator<Item = &str> {
        self.excluded
            .iter()
            .filter(|e| matches!(e.reason, ExclusionReason::Unreachable(_)))
            .map(|e| e.name.as_str())
    }

    /// Outcomes grouped by video, videos in the order they were processed.
    pub fn outcomes_by_video(&self) -> Vec<(&str, Vec<&PairOutcome>)> {
        let mut grouped: Vec<(&str, Vec<&PairOutcome>)> = Vec::new();
        for outcome in &self.outcomes {
            match grouped
                .iter_mut()
                .find(|(video, _)| *video == outcome.video_name)
            {
                Some((_, pairs)) => pairs.push(outcome),
                None => grouped.push((&outcome.video_name, vec![outcome])),
            }
        }
        grouped
    }
}
