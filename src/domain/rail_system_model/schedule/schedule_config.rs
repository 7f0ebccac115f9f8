use crate::domain::rail_system_model::utils::time::{MINUTES_PER_DAY, Minutes, TimeInterval};

/// Tunables of the scheduling core.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleConfig {
    /// How far past its anchor (original start) the resolver may push a block.
    pub horizon_minutes: Minutes,

    /// Effective day boundary. A block shifted past `service_day.end` is unresolvable.
    pub service_day: TimeInterval,

    /// Minimum gap between two consecutive blocks on the same resource.
    pub safety_buffer_minutes: Minutes,

    /// Weather derate factor is `1 + derate_coefficient * severity`.
    pub derate_coefficient: f64,

    /// Number of past snapshots kept for forking at an earlier version.
    pub history_depth: usize,

    /// Slot width of the timeline load summary.
    pub timeline_slot_minutes: Minutes,

    /// Maximum number of resource passes a cascading scenario resolution may take.
    pub cascade_budget: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            horizon_minutes: 240,
            service_day: TimeInterval::new(0, MINUTES_PER_DAY),
            safety_buffer_minutes: 0,
            derate_coefficient: 0.1,
            history_depth: 32,
            timeline_slot_minutes: 15,
            cascade_budget: 256,
        }
    }
}

impl ScheduleConfig {
    /// Whether a block anchored at `anchor` may be placed at `interval`: it must start within the
    /// horizon and end before the service day does.
    pub fn within_horizon(&self, anchor: Minutes, interval: &TimeInterval) -> bool {
        interval.start <= anchor + self.horizon_minutes && interval.end <= self.service_day.end
    }

    pub fn derate_factor(&self, severity: f64) -> f64 {
        1.0 + self.derate_coefficient * severity
    }
}
