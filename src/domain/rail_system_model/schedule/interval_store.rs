use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::clock::clock::SharedClock;
use crate::domain::rail_system_model::block::block::{Block, BlockId, BlockStatus};
use crate::domain::rail_system_model::conflict::conflict::Conflict;
use crate::domain::rail_system_model::conflict::conflict_detector::ConflictDetector;
use crate::domain::rail_system_model::precedence::precedence_resolver::PrecedenceResolver;
use crate::domain::rail_system_model::precedence::suggestion::Resolution;
use crate::domain::rail_system_model::resource::resource::Resource;
use crate::domain::rail_system_model::schedule::audit_log::{AuditAction, AuditLog, AuditRecord, OverrideRecord};
use crate::domain::rail_system_model::schedule::block_filter::BlockFilter;
use crate::domain::rail_system_model::schedule::placement::{PlacementPolicy, check_placement};
use crate::domain::rail_system_model::schedule::schedule_config::ScheduleConfig;
use crate::domain::rail_system_model::schedule::schedule_state::{ScheduleState, ScheduleVersion};
use crate::domain::rail_system_model::schedule::touch_set::TouchSet;
use crate::domain::rail_system_model::train::train::{PriorityClass, Train};
use crate::domain::rail_system_model::utils::id::{ActorId, ResourceId, TrainId};
use crate::domain::rail_system_model::utils::time::TimeInterval;
use crate::error::{NotFound, ScheduleError};

/// Result of a successful command: its value and the version it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt<T> {
    pub value: T,
    pub version: ScheduleVersion,
}

/// How a transaction validates the caller's view of the store.
pub(crate) enum VersionCheck<'a> {
    /// The store must still be at exactly this version.
    Exact(ScheduleVersion),

    /// Everything committed after `base` must be disjoint from `touched` (scenario commit).
    CompatibleSince { base: ScheduleVersion, touched: &'a TouchSet },
}

#[derive(Debug)]
struct HistoryEntry {
    state: ScheduleState,

    /// What the command producing `state` wrote.
    touched: TouchSet,
}

#[derive(Debug)]
struct StoreInner {
    state: ScheduleState,
    conflicts: Arc<Vec<Conflict>>,
    resolution: Arc<Resolution>,

    /// The most recent versions, current one last.
    history: VecDeque<HistoryEntry>,
    audit: AuditLog,
}

/// The authoritative, versioned schedule.
///
/// Readers take a cheap snapshot under the read lock. Writers are serialised by the write lock and
/// every command is a compare-and-swap on the version: it is computed on a copy of the current state
/// and installed only if the caller's expected version is still current. Conflicts and precedence
/// suggestions are recomputed for every installed version, so readers never see a partial mutation.
///
/// Clones share the same store; `as_actor` yields a handle recording a different actor in the audit log.
#[derive(Debug, Clone)]
pub struct IntervalStore {
    inner: Arc<RwLock<StoreInner>>,
    config: Arc<ScheduleConfig>,
    clock: SharedClock,
    actor: ActorId,
}

impl IntervalStore {
    pub fn new(state: ScheduleState, config: ScheduleConfig, clock: SharedClock) -> Self {
        let conflicts = ConflictDetector::detect(&state, &config);
        let resolution = PrecedenceResolver::new(&config).resolve(&state, &conflicts);

        log::info!(
            "Interval store created at v{} with {} resource(s), {} train(s), {} block(s) and {} conflict(s).",
            state.version(),
            state.resources().len(),
            state.trains().len(),
            state.block_count(),
            conflicts.len()
        );

        let mut history = VecDeque::new();
        history.push_back(HistoryEntry { state: state.clone(), touched: TouchSet::new() });

        let inner = StoreInner { state, conflicts: Arc::new(conflicts), resolution: Arc::new(resolution), history, audit: AuditLog::new() };

        IntervalStore { inner: Arc::new(RwLock::new(inner)), config: Arc::new(config), clock, actor: ActorId::new("system") }
    }

    /// A handle on the same store that records `actor` for its commands.
    pub fn as_actor(&self, actor: impl Into<String>) -> Self {
        IntervalStore { actor: ActorId::new(actor), ..self.clone() }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current_version(&self) -> ScheduleVersion {
        self.read().state.version()
    }

    /// The current state. Shares all data with the store; later commands do not affect it.
    pub fn snapshot(&self) -> ScheduleState {
        self.read().state.clone()
    }

    /// The state at a retained earlier version.
    pub fn snapshot_at(&self, version: ScheduleVersion) -> Result<ScheduleState, ScheduleError> {
        let guard = self.read();
        guard
            .history
            .iter()
            .find(|entry| entry.state.version() == version)
            .map(|entry| entry.state.clone())
            .ok_or_else(|| NotFound::Version(version).into())
    }

    pub fn list_blocks(&self, filter: &BlockFilter) -> Vec<Block> {
        filter.select(&self.read().state)
    }

    pub fn block(&self, id: BlockId) -> Result<Block, ScheduleError> {
        self.read().state.require_block(id).cloned()
    }

    /// Blocks on `resource_id` intersecting `interval` (half-open), ordered by `(start, id)`.
    pub fn overlaps(&self, resource_id: &ResourceId, interval: &TimeInterval) -> Result<Vec<BlockId>, ScheduleError> {
        let guard = self.read();
        guard.state.resource(resource_id)?;
        Ok(guard.state.overlaps(resource_id, interval))
    }

    /// Conflicts of the current version, canonically sorted.
    pub fn conflicts(&self) -> Arc<Vec<Conflict>> {
        self.read().conflicts.clone()
    }

    /// Precedence order and suggestions for the current conflicts.
    pub fn resolution(&self) -> Arc<Resolution> {
        self.read().resolution.clone()
    }

    /// Conflicts, resolution and state of one version, read consistently.
    pub fn view(&self) -> (ScheduleState, Arc<Vec<Conflict>>, Arc<Resolution>) {
        let guard = self.read();
        (guard.state.clone(), guard.conflicts.clone(), guard.resolution.clone())
    }

    pub fn audit_log(&self) -> Vec<AuditRecord> {
        self.read().audit.records().to_vec()
    }

    /// Places a train on a resource.
    ///
    /// Fails with `ConstraintViolation` for a degenerate interval or an incompatible resource and
    /// with `Overlap` when the resource is occupied, unless `allow_conflict` is set. An override is
    /// recorded in the audit log and marks the block; degenerate intervals are never accepted.
    pub fn assign(
        &self,
        expected_version: ScheduleVersion,
        train_id: &TrainId,
        resource_id: &ResourceId,
        interval: TimeInterval,
        allow_conflict: bool,
    ) -> Result<Receipt<BlockId>, ScheduleError> {
        let config = self.config.as_ref();

        self.transact(VersionCheck::Exact(expected_version), |state, overrides| {
            let bypassed = check_placement(state, config, train_id, resource_id, &interval, None, PlacementPolicy::from_override(allow_conflict), overrides)?;
            let block_id = state.insert_block(train_id, resource_id, interval, BlockStatus::Scheduled, bypassed)?;
            overrides.iter_mut().for_each(|record| record.assign_block(block_id));

            let action = AuditAction::Assign { block_id, train_id: train_id.clone(), resource_id: resource_id.clone(), interval };
            Ok((block_id, action))
        })
    }

    /// Replaces the interval of a block in place, with the same validation as `assign`.
    pub fn reschedule(&self, expected_version: ScheduleVersion, block_id: BlockId, interval: TimeInterval, allow_conflict: bool) -> Result<Receipt<()>, ScheduleError> {
        let config = self.config.as_ref();

        self.transact(VersionCheck::Exact(expected_version), |state, overrides| {
            let block = state.require_block(block_id)?;
            let (train_id, resource_id) = (block.train_id.clone(), block.resource_id.clone());

            let policy = PlacementPolicy::from_override(allow_conflict);
            let bypassed = check_placement(state, config, &train_id, &resource_id, &interval, Some(block_id), policy, overrides)?;

            state.update_block(block_id, |block| {
                block.interval = interval;
                block.conflict_override = bypassed;
            })?;

            Ok(((), AuditAction::Reschedule { block_id, interval }))
        })
    }

    /// Moves a block to another resource, keeping its interval. On failure the block is untouched.
    pub fn move_block(&self, expected_version: ScheduleVersion, block_id: BlockId, resource_id: &ResourceId, allow_conflict: bool) -> Result<Receipt<()>, ScheduleError> {
        let config = self.config.as_ref();

        self.transact(VersionCheck::Exact(expected_version), |state, overrides| {
            let block = state.require_block(block_id)?;
            let (train_id, interval) = (block.train_id.clone(), block.interval);

            let policy = PlacementPolicy::from_override(allow_conflict);
            let bypassed = check_placement(state, config, &train_id, resource_id, &interval, Some(block_id), policy, overrides)?;

            state.update_block(block_id, |block| {
                block.resource_id = resource_id.clone();
                block.conflict_override = bypassed;
            })?;

            Ok(((), AuditAction::MoveBlock { block_id, resource_id: resource_id.clone() }))
        })
    }

    /// Removes a block. Releasing the same block twice fails with `NotFound`.
    pub fn release(&self, expected_version: ScheduleVersion, block_id: BlockId) -> Result<Receipt<Block>, ScheduleError> {
        self.transact(VersionCheck::Exact(expected_version), |state, _| {
            let block = state.remove_block(block_id)?;
            Ok((block, AuditAction::Release { block_id }))
        })
    }

    pub fn set_status(&self, expected_version: ScheduleVersion, block_id: BlockId, status: BlockStatus) -> Result<Receipt<()>, ScheduleError> {
        self.transact(VersionCheck::Exact(expected_version), |state, _| {
            state.update_block(block_id, |block| block.status = status)?;
            Ok(((), AuditAction::SetStatus { block_id, status }))
        })
    }

    pub fn reprioritize(&self, expected_version: ScheduleVersion, train_id: &TrainId, priority_class: PriorityClass) -> Result<Receipt<()>, ScheduleError> {
        self.transact(VersionCheck::Exact(expected_version), |state, _| {
            state.set_priority(train_id, priority_class)?;
            Ok(((), AuditAction::Reprioritize { train_id: train_id.clone(), priority_class }))
        })
    }

    pub fn register_train(&self, expected_version: ScheduleVersion, train: Train) -> Result<Receipt<()>, ScheduleError> {
        self.transact(VersionCheck::Exact(expected_version), |state, _| {
            let train_id = train.id.clone();
            state.add_train(train)?;
            Ok(((), AuditAction::RegisterTrain { train_id }))
        })
    }

    /// Fails with `TrainInUse` while any block references the train.
    pub fn remove_train(&self, expected_version: ScheduleVersion, train_id: &TrainId) -> Result<Receipt<Train>, ScheduleError> {
        self.transact(VersionCheck::Exact(expected_version), |state, _| {
            let train = state.remove_train(train_id)?;
            Ok((train, AuditAction::RemoveTrain { train_id: train_id.clone() }))
        })
    }

    pub fn register_resource(&self, expected_version: ScheduleVersion, resource: Resource) -> Result<Receipt<()>, ScheduleError> {
        self.transact(VersionCheck::Exact(expected_version), |state, _| {
            let resource_id = resource.id.clone();
            state.add_resource(resource)?;
            Ok(((), AuditAction::RegisterResource { resource_id }))
        })
    }

    /// Admin update of a resource definition. Blocks that no longer fit show up as constraint conflicts.
    pub fn update_resource(&self, expected_version: ScheduleVersion, resource: Resource) -> Result<Receipt<Resource>, ScheduleError> {
        self.transact(VersionCheck::Exact(expected_version), |state, _| {
            let resource_id = resource.id.clone();
            let previous = state.replace_resource(resource)?;
            Ok((previous, AuditAction::UpdateResource { resource_id }))
        })
    }

    /// Fails with `ResourceInUse` while any block references the resource.
    pub fn remove_resource(&self, expected_version: ScheduleVersion, resource_id: &ResourceId) -> Result<Receipt<Resource>, ScheduleError> {
        self.transact(VersionCheck::Exact(expected_version), |state, _| {
            let resource = state.remove_resource(resource_id)?;
            Ok((resource, AuditAction::RemoveResource { resource_id: resource_id.clone() }))
        })
    }

    /// Runs `command` on a copy of the current state and installs the result as the next version.
    ///
    /// Nothing is installed if the version check or the command fails.
    pub(crate) fn transact<T>(
        &self,
        check: VersionCheck<'_>,
        command: impl FnOnce(&mut ScheduleState, &mut Vec<OverrideRecord>) -> Result<(T, AuditAction), ScheduleError>,
    ) -> Result<Receipt<T>, ScheduleError> {
        let mut guard = self.write();
        Self::verify(&guard, &check)?;

        let mut next = guard.state.clone();
        next.advance_version();

        let mut overrides = Vec::new();
        let (value, action) = command(&mut next, &mut overrides)?;

        let version = next.version();
        let touched = next.take_touched();
        let conflicts = ConflictDetector::detect(&next, &self.config);
        let resolution = PrecedenceResolver::new(&self.config).resolve(&next, &conflicts);

        log::info!("v{} {} ({} conflict(s), {} suggestion(s)).", version, action, conflicts.len(), resolution.suggestions.len());

        guard.audit.append(AuditRecord { version, timestamp: self.clock.timestamp(), actor: self.actor.clone(), action, overrides });
        guard.history.push_back(HistoryEntry { state: next.clone(), touched });
        while guard.history.len() > self.config.history_depth.max(1) {
            guard.history.pop_front();
        }

        guard.state = next;
        guard.conflicts = Arc::new(conflicts);
        guard.resolution = Arc::new(resolution);

        Ok(Receipt { value, version })
    }

    fn verify(inner: &StoreInner, check: &VersionCheck<'_>) -> Result<(), ScheduleError> {
        let current = inner.state.version();

        match check {
            VersionCheck::Exact(expected) => {
                if *expected != current {
                    log::debug!("Rejected command expecting v{}, store is at v{}.", expected, current);
                    return Err(ScheduleError::StaleVersion { expected: *expected, current });
                }
            }
            VersionCheck::CompatibleSince { base, touched } => {
                let stale = ScheduleError::StaleVersion { expected: *base, current };
                if *base > current {
                    return Err(stale);
                }

                let retained = inner.history.front().map(|entry| entry.state.version()).unwrap_or(current);
                if *base < current && retained > base + 1 {
                    log::warn!("Versions after v{} are no longer retained, cannot prove compatibility.", base);
                    return Err(stale);
                }

                let intervening = inner.history.iter().filter(|entry| entry.state.version() > *base);
                for entry in intervening {
                    if entry.touched.intersects(touched) {
                        log::info!("v{} touched the same resources or trains as a change based on v{}.", entry.state.version(), base);
                        return Err(stale);
                    }
                }
            }
        }

        Ok(())
    }
}
