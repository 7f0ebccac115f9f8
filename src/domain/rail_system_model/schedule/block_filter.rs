use crate::domain::rail_system_model::block::block::Block;
use crate::domain::rail_system_model::schedule::schedule_state::ScheduleState;
use crate::domain::rail_system_model::utils::id::{ResourceId, TrainId};
use crate::domain::rail_system_model::utils::time::TimeInterval;

/// Selection for block listings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BlockFilter {
    #[default]
    All,
    Resource(ResourceId),
    Train(TrainId),

    /// Blocks intersecting the window.
    Window(TimeInterval),
}

impl BlockFilter {
    /// Blocks of `state` matching the filter.
    ///
    /// Resource and window listings are ordered by resource id, then `(start, id)`; train listings by `(start, id)`.
    pub fn select(&self, state: &ScheduleState) -> Vec<Block> {
        match self {
            BlockFilter::All => state.blocks().cloned().collect(),
            BlockFilter::Resource(resource_id) => state.timeline(resource_id).map(|timeline| timeline.iter().cloned().collect()).unwrap_or_default(),
            BlockFilter::Train(train_id) => state.blocks_of_train(train_id).into_iter().cloned().collect(),
            BlockFilter::Window(window) => state
                .resources()
                .ids()
                .filter_map(|id| state.timeline(id))
                .flat_map(|timeline| timeline.overlapping(window))
                .cloned()
                .collect(),
        }
    }
}
