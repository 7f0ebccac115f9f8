use serde::Serialize;

use crate::domain::rail_system_model::block::resource_timeline::ResourceTimeline;
use crate::domain::rail_system_model::utils::time::{Minutes, TimeInterval};

/// Occupation of a resource (or of several) over a time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadMetric {
    /// The window the load was measured over.
    pub window: TimeInterval,

    /// Occupied minutes inside the window. Overlapping blocks count twice.
    pub occupied_minutes: Minutes,

    /// Minutes available: window length times the number of resources measured.
    pub possible_minutes: Minutes,
}

impl LoadMetric {
    pub fn empty(window: &TimeInterval) -> Self {
        LoadMetric { window: *window, occupied_minutes: 0, possible_minutes: window.duration().max(0) }
    }

    /// Load of one resource, with blocks clipped to the window.
    pub fn of_timeline(timeline: &ResourceTimeline, window: &TimeInterval) -> Self {
        let occupied_minutes = timeline.overlapping(window).filter_map(|block| block.interval.intersection(window)).map(|clipped| clipped.duration()).sum();

        LoadMetric { window: *window, occupied_minutes, possible_minutes: window.duration().max(0) }
    }

    /// Adds the load of another resource measured over the same window.
    pub fn combine(&mut self, other: &LoadMetric) {
        self.occupied_minutes += other.occupied_minutes;
        self.possible_minutes += other.possible_minutes;
    }

    pub fn utilization_percent(&self) -> f64 {
        if self.possible_minutes <= 0 {
            return 0.0;
        }
        self.occupied_minutes as f64 / self.possible_minutes as f64 * 100.0
    }
}
