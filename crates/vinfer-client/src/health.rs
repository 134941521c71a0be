//! Readiness probing across model endpoints.

use std::fmt;

use tracing::info;

use crate::client::SglangClient;

/// Result of one `/health` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    /// Server answered with a non-200 status
    Unhealthy(u16),
    /// Connection failed or timed out
    Unreachable(String),
}

impl HealthStatus {
    /// True only for [`HealthStatus::Healthy`].
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy(status) => write!(f, "health check returned status {}", status),
            HealthStatus::Unreachable(detail) => write!(f, "{}", detail),
        }
    }
}

/// Health of every checked model, in check order.
#[derive(Debug, Clone, Default)]
pub struct HealthReport {
    entries: Vec<(String, HealthStatus)>,
}

impl HealthReport {
    /// Record the status of one model.
    pub fn push(&mut self, model_name: impl Into<String>, status: HealthStatus) {
        self.entries.push((model_name.into(), status));
    }

    /// Status recorded for a model, if it was checked.
    pub fn status(&self, model_name: &str) -> Option<&HealthStatus> {
        self.entries
            .iter()
            .find(|(name, _)| name == model_name)
            .map(|(_, status)| status)
    }

    /// True when the model was checked and found healthy.
    pub fn is_healthy(&self, model_name: &str) -> bool {
        self.status(model_name).is_some_and(HealthStatus::is_healthy)
    }

    /// Number of healthy models.
    pub fn healthy_count(&self) -> usize {
        self.entries.iter().filter(|(_, s)| s.is_healthy()).count()
    }

    /// Models whose health check failed, with the failure.
    pub fn unhealthy(&self) -> impl Iterator<Item = (&str, &HealthStatus)> {
        self.entries
            .iter()
            .filter(|(_, s)| !s.is_healthy())
            .map(|(name, status)| (name.as_str(), status))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Check each endpoint in turn, one request in flight at a time.
pub async fn check_all<'a, I>(clients: I) -> HealthReport
where
    I: IntoIterator<Item = (&'a str, &'a SglangClient)>,
{
    info!("Checking server health...");

    let mut report = HealthReport::default();
    for (name, client) in clients {
        let status = client.health_check().await;
        report.push(name, status);
    }

    info!(
        "{}/{} server(s) healthy",
        report.healthy_count(),
        report.len()
    );
    report
}
