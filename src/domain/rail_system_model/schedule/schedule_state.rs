use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::domain::rail_system_model::block::block::{Block, BlockId, BlockStatus};
use crate::domain::rail_system_model::block::resource_timeline::ResourceTimeline;
use crate::domain::rail_system_model::resource::resource::Resource;
use crate::domain::rail_system_model::resource::resource_registry::ResourceRegistry;
use crate::domain::rail_system_model::schedule::touch_set::TouchSet;
use crate::domain::rail_system_model::train::train::{PriorityClass, Train};
use crate::domain::rail_system_model::train::train_registry::TrainRegistry;
use crate::domain::rail_system_model::utils::id::{ResourceId, TrainId};
use crate::domain::rail_system_model::utils::time::{Minutes, TimeInterval};
use crate::error::{NotFound, ScheduleError};

/// Monotonically increasing version of one interval store.
pub type ScheduleVersion = u64;

/// A complete, immutable-by-convention snapshot of the schedule.
///
/// Every part is behind an `Arc`, so cloning costs `O(resources)` and a writer copies only the
/// timelines it touches (`Arc::make_mut`). The live store, the retained history and every scenario
/// fork are all `ScheduleState` values sharing unchanged timelines.
#[derive(Debug, Clone)]
pub struct ScheduleState {
    version: ScheduleVersion,
    resources: Arc<ResourceRegistry>,
    trains: Arc<TrainRegistry>,
    timelines: BTreeMap<ResourceId, Arc<ResourceTimeline>>,

    /// Resource and start of every block, keyed by id.
    locations: Arc<BTreeMap<BlockId, (ResourceId, Minutes)>>,

    /// Blocks of every train, by id.
    train_blocks: Arc<BTreeMap<TrainId, BTreeSet<BlockId>>>,

    next_block_id: u64,

    /// Everything written since the last `take_touched`.
    touched: TouchSet,
}

impl ScheduleState {
    pub fn new(resources: ResourceRegistry, trains: TrainRegistry) -> Self {
        let timelines = resources.ids().map(|id| (id.clone(), Arc::new(ResourceTimeline::new()))).collect();

        ScheduleState {
            version: 0,
            resources: Arc::new(resources),
            trains: Arc::new(trains),
            timelines,
            locations: Arc::new(BTreeMap::new()),
            train_blocks: Arc::new(BTreeMap::new()),
            next_block_id: 1,
            touched: TouchSet::new(),
        }
    }

    pub fn version(&self) -> ScheduleVersion {
        self.version
    }

    /// Moves this (cloned) state to the next version. Blocks written afterwards carry the new version.
    pub(crate) fn advance_version(&mut self) {
        self.version += 1;
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn trains(&self) -> &TrainRegistry {
        &self.trains
    }

    pub fn resource(&self, id: &ResourceId) -> Result<&Resource, ScheduleError> {
        self.resources.get(id).ok_or_else(|| NotFound::Resource(id.clone()).into())
    }

    pub fn train(&self, id: &TrainId) -> Result<&Train, ScheduleError> {
        self.trains.get(id).ok_or_else(|| NotFound::Train(id.clone()).into())
    }

    pub fn timeline(&self, id: &ResourceId) -> Option<&ResourceTimeline> {
        self.timelines.get(id).map(|timeline| timeline.as_ref())
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        let (resource_id, start) = self.locations.get(&id)?;
        self.timelines.get(resource_id)?.get(id, *start)
    }

    pub fn require_block(&self, id: BlockId) -> Result<&Block, ScheduleError> {
        self.block(id).ok_or_else(|| NotFound::Block(id).into())
    }

    /// All blocks, ordered by resource id and then by `(start, id)`.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.timelines.values().flat_map(|timeline| timeline.iter())
    }

    pub fn block_count(&self) -> usize {
        self.locations.len()
    }

    /// Blocks of a train ordered by `(start, id)`.
    pub fn blocks_of_train(&self, id: &TrainId) -> Vec<&Block> {
        let mut blocks: Vec<&Block> = match self.train_blocks.get(id) {
            Some(ids) => ids.iter().filter_map(|block_id| self.block(*block_id)).collect(),
            None => Vec::new(),
        };
        blocks.sort_by_key(|block| (block.start(), block.id));
        blocks
    }

    pub fn has_blocks_on(&self, id: &ResourceId) -> bool {
        self.timelines.get(id).is_some_and(|timeline| !timeline.is_empty())
    }

    pub fn has_blocks_of(&self, id: &TrainId) -> bool {
        self.train_blocks.get(id).is_some_and(|ids| !ids.is_empty())
    }

    /// Ids of the blocks on `resource_id` intersecting `interval`, ordered by `(start, id)`.
    pub fn overlaps(&self, resource_id: &ResourceId, interval: &TimeInterval) -> Vec<BlockId> {
        match self.timelines.get(resource_id) {
            Some(timeline) => timeline.overlapping(interval).map(|block| block.id).collect(),
            None => Vec::new(),
        }
    }

    pub fn touched(&self) -> &TouchSet {
        &self.touched
    }

    pub(crate) fn take_touched(&mut self) -> TouchSet {
        std::mem::take(&mut self.touched)
    }

    /// Inserts a new block without any validation. Callers check placement first.
    pub(crate) fn insert_block(
        &mut self,
        train_id: &TrainId,
        resource_id: &ResourceId,
        interval: TimeInterval,
        status: BlockStatus,
        conflict_override: bool,
    ) -> Result<BlockId, ScheduleError> {
        if !self.trains.contains(train_id) {
            return Err(NotFound::Train(train_id.clone()).into());
        }

        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;

        let block = Block {
            id,
            train_id: train_id.clone(),
            resource_id: resource_id.clone(),
            interval,
            status,
            source_version: self.version,
            original_start: interval.start,
            conflict_override,
        };

        self.index_block(block)?;
        Ok(id)
    }

    /// Applies `update` to a block and re-indexes it if its resource or start changed.
    ///
    /// The update runs on a detached copy; if the new resource does not exist the block is left untouched.
    pub(crate) fn update_block(&mut self, id: BlockId, update: impl FnOnce(&mut Block)) -> Result<&Block, ScheduleError> {
        let mut block = self.require_block(id)?.clone();
        let old_resource = block.resource_id.clone();
        update(&mut block);

        if !self.timelines.contains_key(&block.resource_id) {
            return Err(NotFound::Resource(block.resource_id.clone()).into());
        }

        block.id = id;
        block.source_version = self.version;
        self.touched.touch_resource(&old_resource);

        self.remove_block(id)?;
        self.index_block(block)?;
        self.require_block(id)
    }

    pub(crate) fn remove_block(&mut self, id: BlockId) -> Result<Block, ScheduleError> {
        let (resource_id, start) = Arc::make_mut(&mut self.locations).remove(&id).ok_or(NotFound::Block(id))?;

        let removed = self.timelines.get_mut(&resource_id).map(Arc::make_mut).and_then(|timeline| timeline.remove(id, start));
        let block = removed.ok_or(NotFound::Block(id))?;

        if let Some(ids) = Arc::make_mut(&mut self.train_blocks).get_mut(&block.train_id) {
            ids.remove(&id);
        }

        self.touched.touch_resource(&block.resource_id);
        self.touched.touch_train(&block.train_id);
        Ok(block)
    }

    fn index_block(&mut self, block: Block) -> Result<(), ScheduleError> {
        let timeline = self.timelines.get_mut(&block.resource_id).map(Arc::make_mut).ok_or_else(|| NotFound::Resource(block.resource_id.clone()))?;

        self.touched.touch_resource(&block.resource_id);
        self.touched.touch_train(&block.train_id);

        Arc::make_mut(&mut self.locations).insert(block.id, (block.resource_id.clone(), block.start()));
        Arc::make_mut(&mut self.train_blocks).entry(block.train_id.clone()).or_default().insert(block.id);
        timeline.insert(block);
        Ok(())
    }

    pub(crate) fn add_resource(&mut self, resource: Resource) -> Result<(), ScheduleError> {
        let id = resource.id.clone();
        if !Arc::make_mut(&mut self.resources).add(resource) {
            return Err(ScheduleError::DuplicateResource(id));
        }

        self.timelines.insert(id.clone(), Arc::new(ResourceTimeline::new()));
        self.touched.touch_resource(&id);
        Ok(())
    }

    pub(crate) fn replace_resource(&mut self, resource: Resource) -> Result<Resource, ScheduleError> {
        let id = resource.id.clone();
        let previous = Arc::make_mut(&mut self.resources).replace(resource).ok_or_else(|| NotFound::Resource(id.clone()))?;

        self.touched.touch_resource(&id);
        Ok(previous)
    }

    pub(crate) fn remove_resource(&mut self, id: &ResourceId) -> Result<Resource, ScheduleError> {
        if !self.resources.contains(id) {
            return Err(NotFound::Resource(id.clone()).into());
        }
        if self.has_blocks_on(id) {
            return Err(ScheduleError::ResourceInUse(id.clone()));
        }

        self.timelines.remove(id);
        self.touched.touch_resource(id);
        Arc::make_mut(&mut self.resources).remove(id).ok_or_else(|| NotFound::Resource(id.clone()).into())
    }

    /// Registers a train. Registering an identical definition again is a no-op.
    pub(crate) fn add_train(&mut self, train: Train) -> Result<(), ScheduleError> {
        if self.trains.get(&train.id) == Some(&train) {
            return Ok(());
        }

        let id = train.id.clone();
        if !Arc::make_mut(&mut self.trains).add(train) {
            return Err(ScheduleError::DuplicateTrain(id));
        }

        self.touched.touch_train(&id);
        Ok(())
    }

    pub(crate) fn remove_train(&mut self, id: &TrainId) -> Result<Train, ScheduleError> {
        if !self.trains.contains(id) {
            return Err(NotFound::Train(id.clone()).into());
        }
        if self.has_blocks_of(id) {
            return Err(ScheduleError::TrainInUse(id.clone()));
        }

        Arc::make_mut(&mut self.train_blocks).remove(id);
        self.touched.touch_train(id);
        Arc::make_mut(&mut self.trains).remove(id).ok_or_else(|| NotFound::Train(id.clone()).into())
    }

    pub(crate) fn set_priority(&mut self, id: &TrainId, priority_class: PriorityClass) -> Result<(), ScheduleError> {
        if !Arc::make_mut(&mut self.trains).set_priority(id, priority_class) {
            return Err(NotFound::Train(id.clone()).into());
        }

        self.touched.touch_train(id);
        Ok(())
    }
}
