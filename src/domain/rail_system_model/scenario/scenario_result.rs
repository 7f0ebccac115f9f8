use serde::Serialize;
use std::fmt;

use crate::domain::rail_system_model::scenario::scenario_metrics::ScenarioMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Completed,

    /// Residual conflicts remain that the resolver could not place.
    Failed,
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioStatus::Completed => write!(f, "completed"),
            ScenarioStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A named, saved scenario evaluation. One row of the scenario export.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub name: String,

    /// RFC 3339, from the injected clock.
    pub timestamp: String,
    pub metrics: ScenarioMetrics,
    pub status: ScenarioStatus,
}

impl ScenarioResult {
    pub fn new(name: impl Into<String>, timestamp: String, metrics: ScenarioMetrics) -> Self {
        let status = if metrics.conflict_count == 0 { ScenarioStatus::Completed } else { ScenarioStatus::Failed };
        ScenarioResult { name: name.into(), timestamp, metrics, status }
    }
}
