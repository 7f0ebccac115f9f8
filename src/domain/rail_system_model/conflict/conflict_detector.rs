use std::cmp::Ordering;

use crate::domain::rail_system_model::block::block::Block;
use crate::domain::rail_system_model::block::resource_timeline::ResourceTimeline;
use crate::domain::rail_system_model::conflict::conflict::Conflict;
use crate::domain::rail_system_model::constraint::constraint_validator::ConstraintValidator;
use crate::domain::rail_system_model::constraint::constraint_violation::ConstraintViolation;
use crate::domain::rail_system_model::resource::resource::Resource;
use crate::domain::rail_system_model::schedule::schedule_config::ScheduleConfig;
use crate::domain::rail_system_model::schedule::schedule_state::ScheduleState;

/// Computes the full conflict set of a snapshot.
///
/// Stateless and deterministic: the output is sorted, overlaps first (by resource, then block pair),
/// then constraint conflicts (by block, in validator order).
pub struct ConflictDetector;

impl ConflictDetector {
    pub fn detect(state: &ScheduleState, config: &ScheduleConfig) -> Vec<Conflict> {
        let mut overlaps = Vec::new();
        let mut constraints = Vec::new();

        for resource in state.resources().iter() {
            let Some(timeline) = state.timeline(&resource.id) else {
                log::error!("Resource {} has no timeline in schedule v{}.", resource.id, state.version());
                continue;
            };

            Self::sweep_overlaps(resource, timeline, &mut overlaps);
            Self::collect_constraints(state, resource, timeline, config, &mut constraints);
        }

        overlaps.sort_by(Self::compare);
        constraints.sort_by(Self::compare);

        overlaps.extend(constraints);
        overlaps
    }

    /// Overlap pairs on one resource. Blocks are visited in `(start, id)` order while the set of
    /// still-open blocks is kept, so the cost is `O(n + pairs)` for sparse timelines.
    fn sweep_overlaps(resource: &Resource, timeline: &ResourceTimeline, conflicts: &mut Vec<Conflict>) {
        let mut open: Vec<&Block> = Vec::new();

        for block in timeline.iter() {
            open.retain(|candidate| candidate.end() > block.start());

            for candidate in &open {
                if let Some(overlap) = candidate.interval.intersection(&block.interval) {
                    conflicts.push(Conflict::overlap(resource.id.clone(), candidate.id, block.id, overlap));
                }
            }

            open.push(block);
        }
    }

    fn collect_constraints(state: &ScheduleState, resource: &Resource, timeline: &ResourceTimeline, config: &ScheduleConfig, conflicts: &mut Vec<Conflict>) {
        let mut latest: Option<&Block> = None;

        for block in timeline.iter() {
            match state.train(&block.train_id) {
                Ok(train) => {
                    for violation in ConstraintValidator::violations(train, resource) {
                        conflicts.push(Conflict::Constraint { block_id: block.id, violation });
                    }
                }
                Err(_) => log::error!("Block {} references unknown train {}.", block.id, block.train_id),
            }

            if config.safety_buffer_minutes > 0 {
                if let Some(previous) = latest {
                    let gap = block.start() - previous.end();
                    if gap >= 0 && gap < config.safety_buffer_minutes {
                        conflicts.push(Conflict::Constraint {
                            block_id: block.id,
                            violation: ConstraintViolation::InsufficientHeadway {
                                resource_id: resource.id.clone(),
                                neighbour: previous.id,
                                gap,
                                required: config.safety_buffer_minutes,
                            },
                        });
                    }
                }
            }

            // The preceding block for headway purposes is the one ending last so far.
            if latest.is_none_or(|previous| block.end() > previous.end()) {
                latest = Some(block);
            }
        }
    }

    /// Total order used for the canonical output.
    fn compare(a: &Conflict, b: &Conflict) -> Ordering {
        match (a, b) {
            (
                Conflict::Overlap { resource_id: ra, block_a: a1, block_b: b1, .. },
                Conflict::Overlap { resource_id: rb, block_a: a2, block_b: b2, .. },
            ) => (ra, a1, b1).cmp(&(rb, a2, b2)),
            (Conflict::Overlap { .. }, Conflict::Constraint { .. }) => Ordering::Less,
            (Conflict::Constraint { .. }, Conflict::Overlap { .. }) => Ordering::Greater,
            (Conflict::Constraint { block_id: a, violation: va }, Conflict::Constraint { block_id: b, violation: vb }) => {
                a.cmp(b).then_with(|| Self::rank(va).cmp(&Self::rank(vb)))
            }
        }
    }

    fn rank(violation: &ConstraintViolation) -> u8 {
        match violation {
            ConstraintViolation::ResourceUnavailable { .. } => 0,
            ConstraintViolation::LengthExceeded { .. } => 1,
            ConstraintViolation::ElectrificationMismatch { .. } => 2,
            ConstraintViolation::AccessibilityMismatch { .. } => 3,
            ConstraintViolation::DegenerateInterval { .. } => 4,
            ConstraintViolation::InsufficientHeadway { .. } => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rail_system_model::block::block::{BlockId, BlockStatus};
    use crate::domain::rail_system_model::resource::resource_registry::ResourceRegistry;
    use crate::domain::rail_system_model::train::train::{PriorityClass, Train, TrainClass};
    use crate::domain::rail_system_model::train::train_registry::TrainRegistry;
    use crate::domain::rail_system_model::utils::id::{ResourceId, TrainId};
    use crate::domain::rail_system_model::utils::time::TimeInterval;

    fn state() -> ScheduleState {
        let mut resources = ResourceRegistry::new();
        resources.add(Resource::platform("P1", 400.0, true, true));
        resources.add(Resource::track("TA", 800.0, false));

        let mut trains = TrainRegistry::new();
        trains.add(Train::new("T1", TrainClass::Express, PriorityClass::High, 200.0, true));
        trains.add(Train::new("T2", TrainClass::Local, PriorityClass::Medium, 120.0, false));
        trains.add(Train::new("T3", TrainClass::Local, PriorityClass::Low, 120.0, false));

        ScheduleState::new(resources, trains)
    }

    fn place(state: &mut ScheduleState, train: &str, resource: &str, interval: TimeInterval) -> BlockId {
        state.insert_block(&TrainId::new(train), &ResourceId::new(resource), interval, BlockStatus::Scheduled, true).unwrap()
    }

    #[test]
    fn test_detects_canonical_overlap_pairs() {
        let mut state = state();
        let b1 = place(&mut state, "T2", "P1", TimeInterval::hm((16, 0), (17, 0)));
        let b2 = place(&mut state, "T1", "P1", TimeInterval::hm((14, 0), (16, 30)));
        let b3 = place(&mut state, "T3", "P1", TimeInterval::hm((16, 30), (16, 45)));

        let conflicts = ConflictDetector::detect(&state, &ScheduleConfig::default());

        assert_eq!(
            conflicts,
            vec![
                Conflict::Overlap { resource_id: ResourceId::new("P1"), block_a: b1, block_b: b2, overlap: TimeInterval::hm((16, 0), (16, 30)) },
                Conflict::Overlap { resource_id: ResourceId::new("P1"), block_a: b1, block_b: b3, overlap: TimeInterval::hm((16, 30), (16, 45)) },
            ]
        );
    }

    #[test]
    fn test_detects_constraint_conflicts_after_insertion() {
        let mut state = state();
        let block = place(&mut state, "T1", "TA", TimeInterval::new(60, 90));

        let conflicts = ConflictDetector::detect(&state, &ScheduleConfig::default());
        assert_eq!(conflicts.len(), 1);
        assert!(matches!(
            &conflicts[0],
            Conflict::Constraint { block_id, violation: ConstraintViolation::ElectrificationMismatch { .. } } if *block_id == block
        ));
    }

    #[test]
    fn test_headway_conflict_with_buffer() {
        let mut state = state();
        place(&mut state, "T2", "P1", TimeInterval::new(0, 60));
        let late = place(&mut state, "T3", "P1", TimeInterval::new(63, 90));

        let config = ScheduleConfig { safety_buffer_minutes: 5, ..ScheduleConfig::default() };
        let conflicts = ConflictDetector::detect(&state, &config);

        assert_eq!(conflicts.len(), 1);
        assert!(matches!(&conflicts[0], Conflict::Constraint { block_id, violation: ConstraintViolation::InsufficientHeadway { gap: 3, .. } } if *block_id == late));
        assert!(ConflictDetector::detect(&state, &ScheduleConfig::default()).is_empty());
    }

    #[test]
    fn test_output_is_identical_for_equal_state() {
        let mut state = state();
        place(&mut state, "T1", "P1", TimeInterval::new(0, 100));
        place(&mut state, "T2", "P1", TimeInterval::new(50, 150));
        place(&mut state, "T3", "P1", TimeInterval::new(60, 70));
        place(&mut state, "T1", "TA", TimeInterval::new(0, 10));

        let config = ScheduleConfig::default();
        let first = ConflictDetector::detect(&state, &config);
        let second = ConflictDetector::detect(&state.clone(), &config);

        assert_eq!(first, second);
        assert_eq!(first.iter().filter(|conflict| conflict.is_overlap()).count(), 3);
    }
}
