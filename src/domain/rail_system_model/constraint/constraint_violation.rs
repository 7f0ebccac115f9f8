use serde::Serialize;
use thiserror::Error;

use crate::domain::rail_system_model::block::block::BlockId;
use crate::domain::rail_system_model::utils::id::{ResourceId, TrainId};
use crate::domain::rail_system_model::utils::time::{Minutes, TimeInterval};

/// A static requirement of a train (or a safety rule) that a resource placement does not meet.
///
/// Always recoverable: pick another resource, another interval or another train definition.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "constraint", rename_all = "camelCase")]
pub enum ConstraintViolation {
    #[error("train {train_id} ({train_length} m) does not fit on resource {resource_id} ({capacity} m)")]
    LengthExceeded { train_id: TrainId, resource_id: ResourceId, train_length: f64, capacity: f64 },

    #[error("train {train_id} requires electrification, resource {resource_id} is not electrified")]
    ElectrificationMismatch { train_id: TrainId, resource_id: ResourceId },

    #[error("train {train_id} requires step-free access, resource {resource_id} is not accessible")]
    AccessibilityMismatch { train_id: TrainId, resource_id: ResourceId },

    #[error("resource {resource_id} is locked for maintenance")]
    ResourceUnavailable { resource_id: ResourceId },

    #[error("interval {interval} is empty or reversed")]
    DegenerateInterval { interval: TimeInterval },

    #[error("block keeps only {gap} min to block {neighbour} on resource {resource_id}, {required} min required")]
    InsufficientHeadway { resource_id: ResourceId, neighbour: BlockId, gap: Minutes, required: Minutes },
}
