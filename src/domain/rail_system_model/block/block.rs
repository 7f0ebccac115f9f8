use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::rail_system_model::schedule::schedule_state::ScheduleVersion;
use crate::domain::rail_system_model::utils::id::{ResourceId, TrainId};
use crate::domain::rail_system_model::utils::time::{Minutes, TimeInterval};

/// Identifier of a block. Allocated from a per-schedule counter, so equal command sequences yield
/// equal ids across process restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BlockId(pub u64);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{:06}", self.0)
    }
}

/// Lifecycle state of a scheduled occupation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    /// Planned and not yet started.
    Scheduled,

    /// The train currently occupies the resource.
    Active,

    /// Planned, but moved later than its original start.
    Delayed,

    /// The occupation is over.
    Completed,
}

impl BlockStatus {
    /// Blocks that have not started yet can still be shifted by perturbations.
    pub fn is_future(&self) -> bool {
        matches!(self, BlockStatus::Scheduled | BlockStatus::Delayed)
    }
}

/// A scheduled occupation of one resource by one train over `[start, end)`.
///
/// Blocks are owned by the schedule state they live in. Scenario forks hold copies, never the
/// live originals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub id: BlockId,
    pub train_id: TrainId,
    pub resource_id: ResourceId,
    pub interval: TimeInterval,
    pub status: BlockStatus,

    /// Version of the schedule that last wrote this block.
    pub source_version: ScheduleVersion,

    /// Start time at creation. Delay is measured against it and it is the second precedence rule.
    pub original_start: Minutes,

    /// The block was admitted through an `allow_conflict` override.
    pub conflict_override: bool,
}

impl Block {
    pub fn start(&self) -> Minutes {
        self.interval.start
    }

    pub fn end(&self) -> Minutes {
        self.interval.end
    }

    pub fn duration(&self) -> Minutes {
        self.interval.duration()
    }

    /// Minutes behind the original plan, never negative.
    pub fn delay(&self) -> Minutes {
        (self.interval.start - self.original_start).max(0)
    }
}
