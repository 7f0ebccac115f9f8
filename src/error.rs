use thiserror::Error;

use crate::domain::rail_system_model::block::block::BlockId;
use crate::domain::rail_system_model::constraint::constraint_violation::ConstraintViolation;
use crate::domain::rail_system_model::schedule::schedule_state::ScheduleVersion;
use crate::domain::rail_system_model::utils::id::{ResourceId, TrainId};

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse network JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Invalid HH:MM time: {0}")]
    TimeParseError(#[from] chrono::ParseError),

    #[error("Failed to write CSV export: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Failed to build internal rail model: {0}")]
    ModelConstructionError(String),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Reference to an entity that does not exist (or no longer exists) in the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFound {
    #[error("block {0}")]
    Block(BlockId),

    #[error("resource {0}")]
    Resource(ResourceId),

    #[error("train {0}")]
    Train(TrainId),

    #[error("schedule version {0} (outside of retained history)")]
    Version(ScheduleVersion),

    #[error("scenario handle")]
    Scenario,
}

/// Typed failures of the scheduling core.
///
/// Every variant is recoverable by the caller; the core never retries on its own.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("Constraint violation: {0}")]
    ConstraintViolation(#[from] ConstraintViolation),

    #[error("Interval overlaps {} block(s) on resource {resource_id}: {conflicting:?}", .conflicting.len())]
    Overlap { resource_id: ResourceId, conflicting: Vec<BlockId> },

    #[error("Stale schedule version: expected {expected}, store is at {current}")]
    StaleVersion { expected: ScheduleVersion, current: ScheduleVersion },

    #[error("Not found: {0}")]
    NotFound(#[from] NotFound),

    #[error("No conflict-free slot found within the resolution horizon for block(s) {0:?}")]
    Unresolvable(Vec<BlockId>),

    #[error("Resource {0} is still referenced by scheduled blocks")]
    ResourceInUse(ResourceId),

    #[error("Train {0} is still referenced by scheduled blocks")]
    TrainInUse(TrainId),

    #[error("Train {0} is already registered with a different definition")]
    DuplicateTrain(TrainId),

    #[error("Resource {0} is already registered")]
    DuplicateResource(ResourceId),

    #[error("Invalid perturbation: {0}")]
    InvalidPerturbation(String),

    #[error("Scenario evaluation was cancelled")]
    Cancelled,

    #[error("Scenario runs need a running Tokio runtime")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_messages() {
        assert_eq!(ScheduleError::from(NotFound::Block(BlockId(7))).to_string(), format!("Not found: block {}", BlockId(7)));
        assert_eq!(NotFound::Version(3).to_string(), "schedule version 3 (outside of retained history)");
        assert_eq!(Error::from(ScheduleError::from(NotFound::Scenario)).to_string(), "Not found: scenario handle");
    }
}
