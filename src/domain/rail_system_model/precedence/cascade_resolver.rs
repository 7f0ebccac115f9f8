use std::collections::{BTreeMap, BTreeSet};

use crate::domain::rail_system_model::block::block::{BlockId, BlockStatus};
use crate::domain::rail_system_model::conflict::conflict::Conflict;
use crate::domain::rail_system_model::conflict::conflict_detector::ConflictDetector;
use crate::domain::rail_system_model::precedence::precedence_resolver::PrecedenceResolver;
use crate::domain::rail_system_model::schedule::schedule_config::ScheduleConfig;
use crate::domain::rail_system_model::schedule::schedule_state::ScheduleState;
use crate::domain::rail_system_model::utils::id::{ResourceId, TrainId};
use crate::domain::rail_system_model::utils::time::{Minutes, TimeInterval};
use crate::error::ScheduleError;

/// What a fork remembers between resolution runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CascadeMemory {
    /// Start of a block when the resolver first considered it. The horizon is measured from here,
    /// so repeated resolution can never push a block further than `anchor + horizon`.
    pub anchors: BTreeMap<BlockId, Minutes>,

    /// Blocks the resolver could not place.
    pub unresolvable: BTreeSet<BlockId>,

    /// The subset of `unresolvable` a knock-on push could not move. These stay flagged when their
    /// resource is planned again, until their train lets them keep their slot.
    pub stranded: BTreeSet<BlockId>,
}

/// Applies precedence plans to a fork and follows the knock-on delays.
///
/// Resources are processed one at a time from a worklist ordered by id. When a block is shifted,
/// later blocks of the same train are pushed so that each starts no earlier than its predecessor
/// ends, and their resources are queued again. Resolution is sequential by construction.
pub struct CascadeResolver<'a> {
    config: &'a ScheduleConfig,
}

impl<'a> CascadeResolver<'a> {
    pub fn new(config: &'a ScheduleConfig) -> Self {
        Self { config }
    }

    /// Resolves the given resources and everything the cascade reaches from them.
    ///
    /// # Returns
    /// The number of blocks that were moved.
    pub fn resolve(&self, state: &mut ScheduleState, dirty: BTreeSet<ResourceId>, memory: &mut CascadeMemory) -> Result<usize, ScheduleError> {
        let resolver = PrecedenceResolver::new(self.config);
        let mut dirty = dirty;
        let mut rounds = 0;
        let mut moved = 0;

        while let Some(resource_id) = dirty.pop_first() {
            rounds += 1;
            if rounds > self.config.cascade_budget {
                log::warn!("Cascade budget of {} rounds exhausted, remaining overlaps are flagged unresolvable.", self.config.cascade_budget);
                self.flag_remaining(state, memory);
                break;
            }

            let anchors = &mut memory.anchors;
            let plan = resolver.plan_resource(state, &resource_id, |block| *anchors.entry(block.id).or_insert(block.start()));

            let stranded = &memory.stranded;
            memory.unresolvable.retain(|id| stranded.contains(id) || state.block(*id).is_some_and(|block| block.resource_id != resource_id));

            for placement in plan.placements {
                let Some(to) = placement.to else {
                    memory.unresolvable.insert(placement.block_id);
                    continue;
                };

                let successors = Self::successors(state, &placement.train_id, placement.block_id);

                state.update_block(placement.block_id, |block| {
                    block.interval = to;
                    if block.start() > block.original_start {
                        block.status = BlockStatus::Delayed;
                    }
                })?;
                moved += 1;

                moved += self.push_successors(state, successors, to.end, &mut dirty, memory)?;
            }
        }

        Ok(moved)
    }

    /// Later future blocks of `train_id`, in their current order.
    fn successors(state: &ScheduleState, train_id: &TrainId, after: BlockId) -> Vec<(BlockId, TimeInterval, ResourceId)> {
        state
            .blocks_of_train(train_id)
            .into_iter()
            .skip_while(|block| block.id != after)
            .skip(1)
            .filter(|block| block.status.is_future())
            .map(|block| (block.id, block.interval, block.resource_id.clone()))
            .collect()
    }

    /// Pushes `successors` so each starts no earlier than the one before it ends.
    ///
    /// A push that would leave the horizon of the block's anchor or the service day is not made:
    /// the block keeps its slot and is stranded.
    fn push_successors(
        &self,
        state: &mut ScheduleState,
        successors: Vec<(BlockId, TimeInterval, ResourceId)>,
        mut previous_end: Minutes,
        dirty: &mut BTreeSet<ResourceId>,
        memory: &mut CascadeMemory,
    ) -> Result<usize, ScheduleError> {
        let mut moved = 0;

        for (id, interval, resource_id) in successors {
            if interval.start >= previous_end {
                Self::release_stranded(memory, id, &resource_id, dirty);
                previous_end = interval.end;
                continue;
            }

            let anchor = *memory.anchors.entry(id).or_insert(interval.start);
            let pushed = interval.with_start(previous_end);

            if !self.config.within_horizon(anchor, &pushed) {
                log::info!("Block {} cannot follow its train to {} within the horizon, flagged unresolvable.", id, pushed);
                memory.stranded.insert(id);
                memory.unresolvable.insert(id);
                previous_end = previous_end.max(interval.end);
                continue;
            }

            Self::release_stranded(memory, id, &resource_id, dirty);
            state.update_block(id, |block| {
                block.interval = pushed;
                block.status = BlockStatus::Delayed;
            })?;

            log::debug!("Block {} pushed to {} by an earlier delay of its train.", id, pushed);
            dirty.insert(resource_id);
            previous_end = pushed.end;
            moved += 1;
        }

        Ok(moved)
    }

    /// Clears the stranded mark of `id`. Its resource is planned again so the plan decides its flag.
    fn release_stranded(memory: &mut CascadeMemory, id: BlockId, resource_id: &ResourceId, dirty: &mut BTreeSet<ResourceId>) {
        if memory.stranded.remove(&id) {
            memory.unresolvable.remove(&id);
            dirty.insert(resource_id.clone());
        }
    }

    fn flag_remaining(&self, state: &ScheduleState, memory: &mut CascadeMemory) {
        for conflict in ConflictDetector::detect(state, self.config) {
            if let Conflict::Overlap { block_a, block_b, .. } = conflict {
                memory.unresolvable.insert(block_a);
                memory.unresolvable.insert(block_b);
            }
        }
    }
}
