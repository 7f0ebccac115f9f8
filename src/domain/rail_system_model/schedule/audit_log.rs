use serde::Serialize;
use std::fmt;

use crate::domain::rail_system_model::block::block::{BlockId, BlockStatus};
use crate::domain::rail_system_model::constraint::constraint_violation::ConstraintViolation;
use crate::domain::rail_system_model::schedule::schedule_state::ScheduleVersion;
use crate::domain::rail_system_model::train::train::PriorityClass;
use crate::domain::rail_system_model::utils::id::{ActorId, ResourceId, TrainId};
use crate::domain::rail_system_model::utils::time::TimeInterval;

/// The command that produced a schedule version.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum AuditAction {
    Assign { block_id: BlockId, train_id: TrainId, resource_id: ResourceId, interval: TimeInterval },
    Reschedule { block_id: BlockId, interval: TimeInterval },
    MoveBlock { block_id: BlockId, resource_id: ResourceId },
    Release { block_id: BlockId },
    SetStatus { block_id: BlockId, status: BlockStatus },
    Reprioritize { train_id: TrainId, priority_class: PriorityClass },
    RegisterTrain { train_id: TrainId },
    RemoveTrain { train_id: TrainId },
    RegisterResource { resource_id: ResourceId },
    UpdateResource { resource_id: ResourceId },
    RemoveResource { resource_id: ResourceId },
    CommitScenario { label: String, base_version: ScheduleVersion, perturbations: usize },
}

impl OverrideRecord {
    /// Fills in the id of a freshly assigned block.
    pub fn assign_block(&mut self, id: BlockId) {
        match self {
            OverrideRecord::Overlap { block_id, .. } | OverrideRecord::Constraint { block_id, .. } => {
                block_id.get_or_insert(id);
            }
            OverrideRecord::Unresolvable { .. } => {}
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditAction::Assign { block_id, train_id, resource_id, interval } => {
                write!(f, "assign {} ({} on {} {})", block_id, train_id, resource_id, interval)
            }
            AuditAction::Reschedule { block_id, interval } => write!(f, "reschedule {} to {}", block_id, interval),
            AuditAction::MoveBlock { block_id, resource_id } => write!(f, "move {} to {}", block_id, resource_id),
            AuditAction::Release { block_id } => write!(f, "release {}", block_id),
            AuditAction::SetStatus { block_id, status } => write!(f, "set status of {} to {:?}", block_id, status),
            AuditAction::Reprioritize { train_id, priority_class } => write!(f, "reprioritize {} to {}", train_id, priority_class),
            AuditAction::RegisterTrain { train_id } => write!(f, "register train {}", train_id),
            AuditAction::RemoveTrain { train_id } => write!(f, "remove train {}", train_id),
            AuditAction::RegisterResource { resource_id } => write!(f, "register resource {}", resource_id),
            AuditAction::UpdateResource { resource_id } => write!(f, "update resource {}", resource_id),
            AuditAction::RemoveResource { resource_id } => write!(f, "remove resource {}", resource_id),
            AuditAction::CommitScenario { label, base_version, perturbations } => {
                write!(f, "commit scenario '{}' forked at v{} ({} perturbations)", label, base_version, perturbations)
            }
        }
    }
}

/// A check that was bypassed through `allow_conflict`. Kept for later review, never dropped.
///
/// `block_id` is `None` only while the block of an `assign` has not been allocated yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "override", rename_all = "camelCase")]
pub enum OverrideRecord {
    Overlap { block_id: Option<BlockId>, resource_id: ResourceId, overlapping: Vec<BlockId> },
    Constraint { block_id: Option<BlockId>, violation: ConstraintViolation },
    Unresolvable { block_ids: Vec<BlockId> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub version: ScheduleVersion,

    /// RFC 3339, taken from the store's clock.
    pub timestamp: String,
    pub actor: ActorId,
    pub action: AuditAction,
    pub overrides: Vec<OverrideRecord>,
}

/// Append-only record of every committed mutation.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    pub fn append(&mut self, record: AuditRecord) {
        if record.overrides.is_empty() {
            log::debug!("v{} {} by {}", record.version, record.action, record.actor);
        } else {
            log::warn!("v{} {} by {} with {} override(s): {:?}", record.version, record.action, record.actor, record.overrides.len(), record.overrides);
        }
        self.records.push(record);
    }

    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Records carrying at least one bypassed check.
    pub fn overrides(&self) -> impl Iterator<Item = &AuditRecord> {
        self.records.iter().filter(|record| !record.overrides.is_empty())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
