use crate::domain::rail_system_model::block::block::BlockId;
use crate::domain::rail_system_model::constraint::constraint_validator::ConstraintValidator;
use crate::domain::rail_system_model::schedule::audit_log::OverrideRecord;
use crate::domain::rail_system_model::schedule::schedule_config::ScheduleConfig;
use crate::domain::rail_system_model::schedule::schedule_state::ScheduleState;
use crate::domain::rail_system_model::utils::id::{ResourceId, TrainId};
use crate::domain::rail_system_model::utils::time::TimeInterval;
use crate::error::ScheduleError;

/// Which checks a placement must pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementPolicy {
    /// Constraints, headway and overlap are all enforced.
    Strict,

    /// Every check is recorded instead of enforced. Degenerate intervals are still rejected.
    AllowConflict,

    /// Constraints are enforced, overlaps and headway are left to the resolver (scenario insertion).
    AdmitOverlap,
}

impl PlacementPolicy {
    pub fn from_override(allow_conflict: bool) -> Self {
        if allow_conflict { PlacementPolicy::AllowConflict } else { PlacementPolicy::Strict }
    }
}

/// Validates placing `train_id` on `resource_id` over `interval` in `state`.
///
/// `moving` is the block being rescheduled or moved; it never conflicts with itself.
/// Bypassed checks are appended to `overrides`.
///
/// # Returns
/// `true` if at least one check was bypassed, i.e. the placement needs the `conflict_override` mark.
pub fn check_placement(
    state: &ScheduleState,
    config: &ScheduleConfig,
    train_id: &TrainId,
    resource_id: &ResourceId,
    interval: &TimeInterval,
    moving: Option<BlockId>,
    policy: PlacementPolicy,
    overrides: &mut Vec<OverrideRecord>,
) -> Result<bool, ScheduleError> {
    ConstraintValidator::validate_interval(interval)?;

    let train = state.train(train_id)?;
    let resource = state.resource(resource_id)?;
    let timeline = state.timeline(resource_id);

    let mut violations = ConstraintValidator::violations(train, resource);
    if policy != PlacementPolicy::AdmitOverlap {
        if let Some(timeline) = timeline {
            if let Err(violation) = ConstraintValidator::validate_headway(resource, timeline, interval, config.safety_buffer_minutes, moving) {
                violations.push(violation);
            }
        }
    }

    let overlapping: Vec<BlockId> = state.overlaps(resource_id, interval).into_iter().filter(|id| Some(*id) != moving).collect();

    let mut bypassed = false;

    if !violations.is_empty() {
        if policy != PlacementPolicy::AllowConflict {
            return Err(violations.remove(0).into());
        }
        bypassed = true;
        overrides.extend(violations.into_iter().map(|violation| OverrideRecord::Constraint { block_id: moving, violation }));
    }

    if !overlapping.is_empty() {
        match policy {
            PlacementPolicy::Strict => {
                return Err(ScheduleError::Overlap { resource_id: resource_id.clone(), conflicting: overlapping });
            }
            PlacementPolicy::AllowConflict => {
                bypassed = true;
                overrides.push(OverrideRecord::Overlap { block_id: moving, resource_id: resource_id.clone(), overlapping });
            }
            PlacementPolicy::AdmitOverlap => {}
        }
    }

    Ok(bypassed)
}
