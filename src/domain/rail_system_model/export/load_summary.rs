use serde::Serialize;
use std::fmt;

use crate::domain::rail_system_model::conflict::conflict::Conflict;
use crate::domain::rail_system_model::schedule::schedule_state::ScheduleState;
use crate::domain::rail_system_model::utils::id::ResourceId;
use crate::domain::rail_system_model::utils::load_metric::LoadMetric;
use crate::domain::rail_system_model::utils::time::{Minutes, TimeInterval};

/// Utilisation band of a resource as shown to controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceLoadStatus {
    Maintenance,
    High,
    Medium,
    Low,
}

impl ResourceLoadStatus {
    pub fn classify(available: bool, utilization_percent: f64) -> Self {
        if !available {
            ResourceLoadStatus::Maintenance
        } else if utilization_percent >= 80.0 {
            ResourceLoadStatus::High
        } else if utilization_percent >= 60.0 {
            ResourceLoadStatus::Medium
        } else {
            ResourceLoadStatus::Low
        }
    }
}

impl fmt::Display for ResourceLoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceLoadStatus::Maintenance => "maintenance",
            ResourceLoadStatus::High => "high",
            ResourceLoadStatus::Medium => "medium",
            ResourceLoadStatus::Low => "low",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUtilization {
    pub resource_id: ResourceId,
    pub utilization_percent: f64,
    pub status: ResourceLoadStatus,
}

/// One row per resource, ordered by resource id.
pub fn resource_utilization(state: &ScheduleState, window: &TimeInterval) -> Vec<ResourceUtilization> {
    state
        .resources()
        .iter()
        .map(|resource| {
            let load = state.timeline(&resource.id).map(|timeline| LoadMetric::of_timeline(timeline, window)).unwrap_or_else(|| LoadMetric::empty(window));
            let utilization_percent = load.utilization_percent();

            ResourceUtilization {
                resource_id: resource.id.clone(),
                utilization_percent,
                status: ResourceLoadStatus::classify(resource.is_available(), utilization_percent),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Normal,
    Busy,
    Critical,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Normal => write!(f, "normal"),
            SlotStatus::Busy => write!(f, "busy"),
            SlotStatus::Critical => write!(f, "critical"),
        }
    }
}

/// Network-wide load of one fixed-width time slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSlot {
    pub interval: TimeInterval,
    pub conflicts: usize,
    pub utilization_percent: f64,
    pub status: SlotStatus,
}

impl TimelineSlot {
    /// Critical above one conflict or 80 %, busy with any conflict or above 60 %.
    pub fn classify(conflicts: usize, utilization_percent: f64) -> SlotStatus {
        if conflicts > 1 || utilization_percent > 80.0 {
            SlotStatus::Critical
        } else if conflicts > 0 || utilization_percent > 60.0 {
            SlotStatus::Busy
        } else {
            SlotStatus::Normal
        }
    }
}

/// Splits `window` into slots of `slot_minutes` (the last one may be shorter) and summarises each.
///
/// A conflict counts for a slot if its overlap (or its block, for constraint conflicts) intersects the slot.
pub fn timeline_load(state: &ScheduleState, conflicts: &[Conflict], window: &TimeInterval, slot_minutes: Minutes) -> Vec<TimelineSlot> {
    if slot_minutes <= 0 || window.is_degenerate() {
        log::warn!("Timeline load requested with slot width {} over {}, nothing to summarise.", slot_minutes, window);
        return Vec::new();
    }

    let mut slots = Vec::new();
    let mut start = window.start;

    while start < window.end {
        let interval = TimeInterval::new(start, (start + slot_minutes).min(window.end));

        let mut load = LoadMetric { window: interval, occupied_minutes: 0, possible_minutes: 0 };
        for resource in state.resources().iter() {
            match state.timeline(&resource.id) {
                Some(timeline) => load.combine(&LoadMetric::of_timeline(timeline, &interval)),
                None => load.combine(&LoadMetric::empty(&interval)),
            }
        }

        let conflict_count = conflicts
            .iter()
            .filter(|conflict| match conflict {
                Conflict::Overlap { overlap, .. } => overlap.intersects(&interval),
                Conflict::Constraint { block_id, .. } => state.block(*block_id).is_some_and(|block| block.interval.intersects(&interval)),
            })
            .count();

        let utilization_percent = load.utilization_percent();
        slots.push(TimelineSlot { interval, conflicts: conflict_count, utilization_percent, status: TimelineSlot::classify(conflict_count, utilization_percent) });

        start = interval.end;
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_thresholds() {
        assert_eq!(TimelineSlot::classify(0, 60.0), SlotStatus::Normal);
        assert_eq!(TimelineSlot::classify(0, 60.5), SlotStatus::Busy);
        assert_eq!(TimelineSlot::classify(1, 0.0), SlotStatus::Busy);
        assert_eq!(TimelineSlot::classify(2, 0.0), SlotStatus::Critical);
        assert_eq!(TimelineSlot::classify(0, 81.0), SlotStatus::Critical);
    }

    #[test]
    fn test_resource_status_bands() {
        assert_eq!(ResourceLoadStatus::classify(true, 80.0), ResourceLoadStatus::High);
        assert_eq!(ResourceLoadStatus::classify(true, 60.0), ResourceLoadStatus::Medium);
        assert_eq!(ResourceLoadStatus::classify(true, 59.9), ResourceLoadStatus::Low);
        assert_eq!(ResourceLoadStatus::classify(false, 95.0), ResourceLoadStatus::Maintenance);
    }
}
