use std::collections::BTreeSet;

use crate::domain::rail_system_model::block::block::{Block, BlockId};
use crate::domain::rail_system_model::conflict::conflict::Conflict;
use crate::domain::rail_system_model::constraint::constraint_validator::ConstraintValidator;
use crate::domain::rail_system_model::precedence::precedence_compare::PrecedenceCompare;
use crate::domain::rail_system_model::precedence::suggestion::{PrecedenceGroup, Resolution, SuggestedAction, Suggestion};
use crate::domain::rail_system_model::schedule::schedule_config::ScheduleConfig;
use crate::domain::rail_system_model::schedule::schedule_state::ScheduleState;
use crate::domain::rail_system_model::utils::id::{ResourceId, TrainId};
use crate::domain::rail_system_model::utils::time::{Minutes, TimeInterval};

/// New position of a displaced block. `to == None` means no slot was found inside the horizon, or
/// the block has already started and cannot give way. The block stays where it is.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub block_id: BlockId,
    pub train_id: TrainId,
    pub rank: usize,
    pub from: TimeInterval,
    pub to: Option<TimeInterval>,
}

/// Precedence groups and placements of one resource.
#[derive(Debug, Clone, Default)]
pub struct ResourcePlan {
    pub groups: Vec<PrecedenceGroup>,
    pub placements: Vec<Placement>,
}

/// Orders competing blocks and proposes greedy forward shifts for the losers.
///
/// The resolver never mutates the schedule. Live callers turn its plan into suggestions; scenario
/// forks apply it directly (see `CascadeResolver`).
pub struct PrecedenceResolver<'a> {
    config: &'a ScheduleConfig,
}

impl<'a> PrecedenceResolver<'a> {
    pub fn new(config: &'a ScheduleConfig) -> Self {
        Self { config }
    }

    /// Builds suggestions for every resource carrying an overlap conflict.
    pub fn resolve(&self, state: &ScheduleState, conflicts: &[Conflict]) -> Resolution {
        let resources: BTreeSet<&ResourceId> = conflicts
            .iter()
            .filter_map(|conflict| match conflict {
                Conflict::Overlap { resource_id, .. } => Some(resource_id),
                Conflict::Constraint { .. } => None,
            })
            .collect();

        let mut resolution = Resolution::default();

        for resource_id in resources {
            let plan = self.plan_resource(state, resource_id, |block| block.start());

            for placement in plan.placements {
                let Some(block) = state.block(placement.block_id) else {
                    continue;
                };

                let action = match placement.to {
                    Some(to) => SuggestedAction::Shift { to },
                    None => SuggestedAction::Unresolvable,
                };

                resolution.suggestions.push(Suggestion {
                    block_id: placement.block_id,
                    train_id: placement.train_id,
                    resource_id: resource_id.clone(),
                    rank: placement.rank,
                    current: placement.from,
                    action,
                    alternative_resource: if block.status.is_future() { self.find_alternative(state, block) } else { None },
                });
            }

            resolution.groups.extend(plan.groups);
        }

        resolution
    }

    /// Plans one resource.
    ///
    /// Blocks are split into connected windows (blocks closer than the safety buffer belong to the
    /// same window). Blocks outside contested windows and blocks that can no longer move are fixed.
    /// The movable members of each window are then placed in precedence order at the earliest start
    /// not earlier than their current one that clears everything placed so far. A block whose slot
    /// would start later than `anchor + horizon` or end after the service day is unresolvable, and so
    /// is a started block that collides with a higher ranked started block.
    pub fn plan_resource(&self, state: &ScheduleState, resource_id: &ResourceId, mut anchor: impl FnMut(&Block) -> Minutes) -> ResourcePlan {
        let mut plan = ResourcePlan::default();
        let Some(timeline) = state.timeline(resource_id) else {
            return plan;
        };

        let buffer = self.config.safety_buffer_minutes;
        let windows = Self::windows(timeline.iter().collect(), buffer);

        let mut placed: Vec<TimeInterval> =
            windows.iter().filter(|window| window.len() < 2).flat_map(|window| window.iter().map(|block| block.interval)).collect();

        let compare = PrecedenceCompare::new(state.trains());

        for mut window in windows.into_iter().filter(|window| window.len() >= 2) {
            window.sort_by(|a, b| compare.compare(a, b));

            plan.groups.push(PrecedenceGroup {
                resource_id: resource_id.clone(),
                window: Self::span(&window),
                order: window.iter().map(|block| block.id).collect(),
            });

            // Started blocks cannot move. When two of them collide, the lower ranked one is unresolvable.
            let mut held: Vec<TimeInterval> = Vec::new();
            for (rank, block) in window.iter().enumerate().filter(|(_, block)| !block.status.is_future()) {
                if held.iter().any(|interval| interval.intersects(&block.interval)) {
                    log::info!("Started block {} on {} collides with a higher ranked started block, flagged unresolvable.", block.id, resource_id);
                    plan.placements.push(Placement { block_id: block.id, train_id: block.train_id.clone(), rank, from: block.interval, to: None });
                }
                held.push(block.interval);
            }
            placed.extend(held);

            for (rank, block) in window.iter().enumerate().filter(|(_, block)| block.status.is_future()) {
                let start = Self::earliest_start(&placed, block.start(), block.duration(), buffer);
                if start == block.start() {
                    placed.push(block.interval);
                    continue;
                }

                let candidate = block.interval.with_start(start);
                let to = if self.config.within_horizon(anchor(block), &candidate) {
                    placed.push(candidate);
                    Some(candidate)
                } else {
                    log::info!("No slot for block {} on {} within the horizon, flagged unresolvable.", block.id, resource_id);
                    placed.push(block.interval);
                    None
                };

                plan.placements.push(Placement { block_id: block.id, train_id: block.train_id.clone(), rank, from: block.interval, to });
            }
        }

        plan
    }

    /// Greedy forward shift: jump past every placed interval the candidate collides with until it is clear.
    ///
    /// Every jump passes at least one obstacle for good, so this takes at most `placed.len()` rounds.
    pub fn earliest_start(placed: &[TimeInterval], from: Minutes, duration: Minutes, buffer: Minutes) -> Minutes {
        let mut start = from;

        loop {
            let candidate = TimeInterval::new(start, start + duration);
            let blocking_end = placed.iter().filter(|interval| interval.intersects_with_buffer(&candidate, buffer)).map(|interval| interval.end).max();

            match blocking_end {
                Some(end) => start = end + buffer,
                None => return start,
            }
        }
    }

    /// First resource of the same kind that accepts the train and is free over the block's interval.
    pub fn find_alternative(&self, state: &ScheduleState, block: &Block) -> Option<ResourceId> {
        let current = state.resource(&block.resource_id).ok()?;
        let train = state.train(&block.train_id).ok()?;

        state
            .resources()
            .of_kind(current.kind)
            .filter(|resource| resource.id != block.resource_id)
            .filter(|resource| ConstraintValidator::validate(train, resource).is_ok())
            .find(|resource| {
                let Some(timeline) = state.timeline(&resource.id) else {
                    return false;
                };
                timeline.overlapping(&block.interval).next().is_none()
                    && ConstraintValidator::validate_headway(resource, timeline, &block.interval, self.config.safety_buffer_minutes, None).is_ok()
            })
            .map(|resource| resource.id.clone())
    }

    /// Splits blocks ordered by `(start, id)` into maximal windows of transitively colliding blocks.
    fn windows(blocks: Vec<&Block>, buffer: Minutes) -> Vec<Vec<&Block>> {
        let mut windows: Vec<Vec<&Block>> = Vec::new();
        let mut window_end = Minutes::MIN;

        for block in blocks {
            let joins = block.start() < window_end.saturating_add(buffer);

            match windows.last_mut() {
                Some(window) if joins => {
                    window.push(block);
                    window_end = window_end.max(block.end());
                }
                _ => {
                    windows.push(vec![block]);
                    window_end = block.end();
                }
            }
        }

        windows
    }

    fn span(window: &[&Block]) -> TimeInterval {
        let start = window.iter().map(|block| block.start()).min().unwrap_or_default();
        let end = window.iter().map(|block| block.end()).max().unwrap_or_default();
        TimeInterval::new(start, end)
    }
}
