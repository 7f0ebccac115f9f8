use serde::Serialize;
use std::fmt;

use crate::domain::rail_system_model::block::block::BlockId;
use crate::domain::rail_system_model::constraint::constraint_violation::ConstraintViolation;
use crate::domain::rail_system_model::utils::id::ResourceId;
use crate::domain::rail_system_model::utils::time::TimeInterval;

/// A derived conflict. Never stored, recomputed after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Conflict {
    /// Two blocks intersect on the same resource. Always `block_a < block_b`.
    Overlap { resource_id: ResourceId, block_a: BlockId, block_b: BlockId, overlap: TimeInterval },

    /// A block whose train no longer satisfies its resource (or violates the safety buffer).
    Constraint { block_id: BlockId, violation: ConstraintViolation },
}

impl Conflict {
    pub fn overlap(resource_id: ResourceId, a: BlockId, b: BlockId, overlap: TimeInterval) -> Self {
        let (block_a, block_b) = if a < b { (a, b) } else { (b, a) };
        Conflict::Overlap { resource_id, block_a, block_b, overlap }
    }

    /// Blocks involved in this conflict.
    pub fn block_ids(&self) -> Vec<BlockId> {
        match self {
            Conflict::Overlap { block_a, block_b, .. } => vec![*block_a, *block_b],
            Conflict::Constraint { block_id, .. } => vec![*block_id],
        }
    }

    pub fn is_overlap(&self) -> bool {
        matches!(self, Conflict::Overlap { .. })
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::Overlap { resource_id, block_a, block_b, overlap } => {
                write!(f, "{}: {} overlaps {} during {}", resource_id, block_a, block_b, overlap)
            }
            Conflict::Constraint { block_id, violation } => write!(f, "{}: {}", block_id, violation),
        }
    }
}
