use futures::future::join_all;
use slotmap::{SlotMap, new_key_type};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

use crate::domain::rail_system_model::block::block::Block;
use crate::domain::rail_system_model::conflict::conflict::Conflict;
use crate::domain::rail_system_model::conflict::conflict_detector::ConflictDetector;
use crate::domain::rail_system_model::precedence::cascade_resolver::CascadeMemory;
use crate::domain::rail_system_model::scenario::perturbation::Perturbation;
use crate::domain::rail_system_model::scenario::scenario::{Scenario, replay};
use crate::domain::rail_system_model::scenario::scenario_metrics::{MetricsDelta, ScenarioMetrics};
use crate::domain::rail_system_model::scenario::scenario_result::ScenarioResult;
use crate::domain::rail_system_model::scenario::scenario_run::ScenarioRun;
use crate::domain::rail_system_model::schedule::audit_log::{AuditAction, OverrideRecord};
use crate::domain::rail_system_model::schedule::block_filter::BlockFilter;
use crate::domain::rail_system_model::schedule::interval_store::{IntervalStore, VersionCheck};
use crate::domain::rail_system_model::schedule::schedule_state::ScheduleVersion;
use crate::domain::rail_system_model::utils::time::TimeInterval;
use crate::error::{NotFound, ScheduleError};

new_key_type! {
    /// Generational handle of a forked scenario. A discarded or committed handle never resolves again.
    pub struct ScenarioHandle;
}

type SharedScenario = Arc<Mutex<Scenario>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs what-if variants of the live schedule.
///
/// Forks never write to the live store; the only way back is `commit`, which replays the
/// perturbations as one versioned transaction. Distinct handles are independent and may be worked
/// on from different threads; one handle is processed sequentially.
#[derive(Debug, Clone)]
pub struct ScenarioSimulator {
    store: IntervalStore,
    scenarios: Arc<Mutex<SlotMap<ScenarioHandle, SharedScenario>>>,
    results: Arc<Mutex<Vec<ScenarioResult>>>,
}

impl ScenarioSimulator {
    pub fn new(store: IntervalStore) -> Self {
        ScenarioSimulator { store, scenarios: Arc::new(Mutex::new(SlotMap::with_key())), results: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Forks the schedule at a retained version. Costs `O(resources)`; block data is shared until written.
    pub fn fork(&self, base_version: ScheduleVersion, label: impl Into<String>) -> Result<ScenarioHandle, ScheduleError> {
        self.fork_with_window(base_version, label, self.store.config().service_day)
    }

    pub fn fork_with_window(&self, base_version: ScheduleVersion, label: impl Into<String>, window: TimeInterval) -> Result<ScenarioHandle, ScheduleError> {
        let base = self.store.snapshot_at(base_version)?;
        let scenario = Scenario::fork(label, base, window);

        log::info!("Forked scenario '{}' at v{}.", scenario.label, base_version);
        Ok(lock(&self.scenarios).insert(Arc::new(Mutex::new(scenario))))
    }

    fn get(&self, handle: ScenarioHandle) -> Result<SharedScenario, ScheduleError> {
        lock(&self.scenarios).get(handle).cloned().ok_or(NotFound::Scenario.into())
    }

    pub fn contains(&self, handle: ScenarioHandle) -> bool {
        lock(&self.scenarios).contains_key(handle)
    }

    /// Applies a perturbation to the fork. A failure leaves the fork exactly as it was.
    pub fn apply(&self, handle: ScenarioHandle, perturbation: Perturbation) -> Result<(), ScheduleError> {
        let scenario = self.get(handle)?;
        let mut scenario = lock(&scenario);
        scenario.apply(perturbation, self.store.config())
    }

    pub fn evaluate(&self, handle: ScenarioHandle) -> Result<ScenarioMetrics, ScheduleError> {
        let scenario = self.get(handle)?;
        let scenario = lock(&scenario);
        Ok(scenario.evaluate())
    }

    /// Metrics of the fork relative to its frozen base.
    pub fn compare(&self, handle: ScenarioHandle) -> Result<MetricsDelta, ScheduleError> {
        let scenario = self.get(handle)?;
        let scenario = lock(&scenario);
        Ok(scenario.evaluate().delta(&scenario.baseline()))
    }

    pub fn list_blocks(&self, handle: ScenarioHandle, filter: &BlockFilter) -> Result<Vec<Block>, ScheduleError> {
        let scenario = self.get(handle)?;
        let scenario = lock(&scenario);
        Ok(filter.select(scenario.state()))
    }

    pub fn conflicts(&self, handle: ScenarioHandle) -> Result<Vec<Conflict>, ScheduleError> {
        let scenario = self.get(handle)?;
        let scenario = lock(&scenario);
        Ok(ConflictDetector::detect(scenario.state(), self.store.config()))
    }

    pub fn discard(&self, handle: ScenarioHandle) -> Result<(), ScheduleError> {
        let scenario = lock(&self.scenarios).remove(handle).ok_or(ScheduleError::NotFound(NotFound::Scenario))?;
        log::info!("Discarded scenario '{}'.", lock(&scenario).label);
        Ok(())
    }

    /// Replays the scenario's perturbations on the live store as one transaction.
    ///
    /// Fails entirely with `StaleVersion` when a commit after the fork touched the same resources or
    /// trains (or the history no longer reaches back to the fork), and with `Unresolvable` when the
    /// replay leaves blocks without a slot and `allow_conflict` is not set. The handle is consumed on
    /// success and kept on failure.
    pub fn commit(&self, handle: ScenarioHandle, allow_conflict: bool) -> Result<ScheduleVersion, ScheduleError> {
        let shared = self.get(handle)?;
        let scenario = lock(&shared);
        let config = self.store.config();

        let check = VersionCheck::CompatibleSince { base: scenario.base_version, touched: scenario.touched() };
        let action = AuditAction::CommitScenario { label: scenario.label.clone(), base_version: scenario.base_version, perturbations: scenario.applied().len() };

        let receipt = self.store.transact(check, |state, overrides| {
            let mut memory = CascadeMemory::default();
            for perturbation in scenario.applied() {
                replay(state, &mut memory, perturbation, config)?;
            }

            if !memory.unresolvable.is_empty() {
                let block_ids: Vec<_> = memory.unresolvable.iter().copied().collect();
                if !allow_conflict {
                    return Err(ScheduleError::Unresolvable(block_ids));
                }
                overrides.push(OverrideRecord::Unresolvable { block_ids });
            }

            Ok(((), action))
        })?;

        drop(scenario);
        lock(&self.scenarios).remove(handle);
        Ok(receipt.version)
    }

    /// Evaluates the scenario and keeps the metrics as a named result.
    pub fn save(&self, handle: ScenarioHandle, name: impl Into<String>) -> Result<ScenarioResult, ScheduleError> {
        let metrics = self.evaluate(handle)?;
        let result = ScenarioResult::new(name, self.store.clock().timestamp(), metrics);

        log::info!("Saved scenario result '{}' ({}).", result.name, result.status);
        lock(&self.results).push(result.clone());
        Ok(result)
    }

    pub fn results(&self) -> Vec<ScenarioResult> {
        lock(&self.results).clone()
    }

    /// Applies a batch of perturbations and evaluates, on the blocking pool of the current Tokio runtime.
    pub fn run(&self, handle: ScenarioHandle, perturbations: Vec<Perturbation>) -> Result<ScenarioRun, ScheduleError> {
        self.run_with_token(handle, perturbations, CancellationToken::new())
    }

    /// Like `run`, with a caller-owned cancellation token.
    ///
    /// Perturbations that fail are skipped (and logged); cancellation between two steps restores the
    /// fork to its state before the run and yields `Cancelled`. Fails with `NoRuntime` when called
    /// outside of a Tokio runtime.
    pub fn run_with_token(&self, handle: ScenarioHandle, perturbations: Vec<Perturbation>, token: CancellationToken) -> Result<ScenarioRun, ScheduleError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ScheduleError::NoRuntime)?;
        let shared = self.get(handle)?;
        let config = self.store.config().clone();
        let task_token = token.clone();

        let task = runtime.spawn_blocking(move || {
            let mut scenario = lock(&shared);
            let checkpoint = scenario.clone();

            for perturbation in perturbations {
                if task_token.is_cancelled() {
                    log::info!("Scenario '{}' run cancelled, rolled back.", checkpoint.label);
                    *scenario = checkpoint;
                    return Err(ScheduleError::Cancelled);
                }

                if let Err(error) = scenario.apply(perturbation.clone(), &config) {
                    log::warn!("Scenario '{}': {} rejected: {}", scenario.label, perturbation, error);
                }
            }

            Ok(scenario.evaluate())
        });

        Ok(ScenarioRun::new(token, task))
    }

    /// Evaluates several scenarios concurrently, results in input order.
    pub async fn evaluate_all(&self, handles: &[ScenarioHandle]) -> Vec<Result<ScenarioMetrics, ScheduleError>> {
        let tasks = handles.iter().map(|handle| {
            let simulator = self.clone();
            let handle = *handle;

            async move {
                match tokio::task::spawn_blocking(move || simulator.evaluate(handle)).await {
                    Ok(result) => result,
                    Err(join_error) => {
                        log::error!("Scenario evaluation task failed: {}", join_error);
                        Err(ScheduleError::Cancelled)
                    }
                }
            }
        });

        join_all(tasks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::clock_mock::MockClock;
    use crate::domain::rail_system_model::resource::resource::Resource;
    use crate::domain::rail_system_model::resource::resource_registry::ResourceRegistry;
    use crate::domain::rail_system_model::schedule::schedule_config::ScheduleConfig;
    use crate::domain::rail_system_model::schedule::schedule_state::ScheduleState;
    use crate::domain::rail_system_model::train::train::{PriorityClass, Train, TrainClass};
    use crate::domain::rail_system_model::train::train_registry::TrainRegistry;
    use crate::domain::rail_system_model::utils::id::{ResourceId, TrainId};

    fn simulator() -> (IntervalStore, ScenarioSimulator) {
        let mut resources = ResourceRegistry::new();
        resources.add(Resource::platform("P1", 400.0, true, true));
        resources.add(Resource::track("TA", 800.0, true));

        let mut trains = TrainRegistry::new();
        trains.add(Train::new("T1", TrainClass::Express, PriorityClass::High, 200.0, true));
        trains.add(Train::new("T2", TrainClass::Local, PriorityClass::Medium, 120.0, false));

        let store = IntervalStore::new(ScheduleState::new(resources, trains), ScheduleConfig::default(), MockClock::at_unix(0).shared());
        store.assign(0, &TrainId::new("T1"), &ResourceId::new("P1"), TimeInterval::hm((14, 0), (15, 0)), false).unwrap();
        store.assign(1, &TrainId::new("T2"), &ResourceId::new("P1"), TimeInterval::hm((15, 0), (16, 0)), false).unwrap();

        let simulator = ScenarioSimulator::new(store.clone());
        (store, simulator)
    }

    #[test]
    fn test_delay_cascades_on_fork_only() {
        let (store, simulator) = simulator();
        let handle = simulator.fork(2, "late express").unwrap();

        simulator.apply(handle, Perturbation::DelayTrain { train_id: TrainId::new("T1"), minutes: 20 }).unwrap();

        let metrics = simulator.evaluate(handle).unwrap();
        // T1 is 20 min late and pushes T2 back by 20 min.
        assert_eq!(metrics.total_delay_minutes, 40);
        assert_eq!(metrics.conflict_count, 0);
        assert_eq!(simulator.compare(handle).unwrap().total_delay_minutes, 40);

        let live = store.list_blocks(&BlockFilter::All);
        assert_eq!(live[0].interval, TimeInterval::hm((14, 0), (15, 0)));
        assert_eq!(store.current_version(), 2);
    }

    #[test]
    fn test_failed_perturbation_keeps_earlier_ones() {
        let (_, simulator) = simulator();
        let handle = simulator.fork(2, "mixed").unwrap();

        simulator.apply(handle, Perturbation::DelayTrain { train_id: TrainId::new("T2"), minutes: 5 }).unwrap();
        let rejected = simulator.apply(handle, Perturbation::DelayTrain { train_id: TrainId::new("T9"), minutes: 5 });

        assert_eq!(rejected, Err(ScheduleError::NotFound(NotFound::Train(TrainId::new("T9")))));
        assert_eq!(simulator.evaluate(handle).unwrap().total_delay_minutes, 5);
    }

    #[test]
    fn test_discard_invalidates_handle() {
        let (_, simulator) = simulator();
        let handle = simulator.fork(2, "throwaway").unwrap();

        simulator.discard(handle).unwrap();
        assert_eq!(simulator.evaluate(handle), Err(ScheduleError::NotFound(NotFound::Scenario)));
        assert_eq!(simulator.discard(handle), Err(ScheduleError::NotFound(NotFound::Scenario)));
    }

    #[test]
    fn test_save_records_named_result() {
        let (_, simulator) = simulator();
        let handle = simulator.fork(1, "baseline").unwrap();

        let result = simulator.save(handle, "Morning baseline").unwrap();
        assert_eq!(result.timestamp, "1970-01-01T00:00:00Z");
        assert_eq!(simulator.results(), vec![result]);
    }

    #[test]
    fn test_run_outside_runtime_is_an_error() {
        let (_, simulator) = simulator();
        let handle = simulator.fork(2, "no runtime").unwrap();

        let run = simulator.run(handle, vec![Perturbation::DelayTrain { train_id: TrainId::new("T1"), minutes: 5 }]);
        assert_eq!(run.err(), Some(ScheduleError::NoRuntime));
        assert_eq!(simulator.evaluate(handle).unwrap().total_delay_minutes, 0);
    }
}
