use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::rail_system_model::schedule::schedule_state::ScheduleState;
use crate::domain::rail_system_model::utils::id::ResourceId;
use crate::domain::rail_system_model::utils::load_metric::LoadMetric;
use crate::domain::rail_system_model::utils::time::{MINUTES_PER_HOUR, Minutes, TimeInterval};

/// Key figures of a schedule over an observation window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioMetrics {
    /// Sum of `max(0, start - original_start)` over all blocks.
    pub total_delay_minutes: Minutes,

    /// Blocks starting inside the window, per window hour.
    pub throughput_per_hour: f64,

    /// Occupied share of the window per resource, in percent.
    pub utilization_percent: BTreeMap<ResourceId, f64>,

    /// Residual conflicts after resolution (unresolvable blocks only).
    pub conflict_count: usize,
}

impl ScenarioMetrics {
    pub fn measure(state: &ScheduleState, window: &TimeInterval, conflict_count: usize) -> Self {
        let total_delay_minutes = state.blocks().map(|block| block.delay()).sum();

        let starting = state.blocks().filter(|block| window.contains(block.start())).count();
        let hours = window.duration() as f64 / MINUTES_PER_HOUR as f64;
        let throughput_per_hour = if hours > 0.0 { starting as f64 / hours } else { 0.0 };

        let utilization_percent = state
            .resources()
            .iter()
            .map(|resource| {
                let load = state.timeline(&resource.id).map(|timeline| LoadMetric::of_timeline(timeline, window)).unwrap_or_else(|| LoadMetric::empty(window));
                (resource.id.clone(), load.utilization_percent())
            })
            .collect();

        ScenarioMetrics { total_delay_minutes, throughput_per_hour, utilization_percent, conflict_count }
    }

    /// Mean utilisation over all resources.
    pub fn mean_utilization_percent(&self) -> f64 {
        if self.utilization_percent.is_empty() {
            return 0.0;
        }
        self.utilization_percent.values().sum::<f64>() / self.utilization_percent.len() as f64
    }

    /// Change from `baseline` to `self`.
    pub fn delta(&self, baseline: &ScenarioMetrics) -> MetricsDelta {
        let utilization_percent = self
            .utilization_percent
            .iter()
            .map(|(id, value)| (id.clone(), value - baseline.utilization_percent.get(id).copied().unwrap_or(0.0)))
            .collect();

        MetricsDelta {
            total_delay_minutes: self.total_delay_minutes - baseline.total_delay_minutes,
            throughput_per_hour: self.throughput_per_hour - baseline.throughput_per_hour,
            utilization_percent,
            conflict_count: self.conflict_count as i64 - baseline.conflict_count as i64,
        }
    }
}

/// Difference between a scenario and the schedule it was forked from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsDelta {
    pub total_delay_minutes: Minutes,
    pub throughput_per_hour: f64,
    pub utilization_percent: BTreeMap<ResourceId, f64>,
    pub conflict_count: i64,
}
