use std::io::Write;
use std::sync::Arc;

use crate::api::network_dto::NetworkDto;
use crate::domain::clock::clock::SharedClock;
use crate::domain::rail_system_model::block::block::{Block, BlockId};
use crate::domain::rail_system_model::conflict::conflict::Conflict;
use crate::domain::rail_system_model::constraint::constraint_validator::ConstraintValidator;
use crate::domain::rail_system_model::export::csv_export::{write_resource_utilization, write_scenario_results, write_timeline};
use crate::domain::rail_system_model::export::load_summary::{ResourceUtilization, TimelineSlot, resource_utilization, timeline_load};
use crate::domain::rail_system_model::precedence::suggestion::{Resolution, SuggestedAction, SuggestionChoice};
use crate::domain::rail_system_model::resource::resource::Resource;
use crate::domain::rail_system_model::resource::resource_registry::ResourceRegistry;
use crate::domain::rail_system_model::scenario::perturbation::Perturbation;
use crate::domain::rail_system_model::scenario::scenario_metrics::ScenarioMetrics;
use crate::domain::rail_system_model::scenario::scenario_result::ScenarioResult;
use crate::domain::rail_system_model::scenario::scenario_simulator::{ScenarioHandle, ScenarioSimulator};
use crate::domain::rail_system_model::schedule::block_filter::BlockFilter;
use crate::domain::rail_system_model::schedule::interval_store::{IntervalStore, Receipt};
use crate::domain::rail_system_model::schedule::schedule_config::ScheduleConfig;
use crate::domain::rail_system_model::schedule::schedule_state::{ScheduleState, ScheduleVersion};
use crate::domain::rail_system_model::train::train::Train;
use crate::domain::rail_system_model::train::train_registry::TrainRegistry;
use crate::domain::rail_system_model::utils::id::{ResourceId, TrainId};
use crate::domain::rail_system_model::utils::time::TimeInterval;
use crate::error::{Error, NotFound, Result, ScheduleError};

/// The query/command boundary of the scheduling core.
///
/// Presentation layers (dashboards, maps, forms) talk to the schedule only through this type. It
/// owns the live store and the scenario simulator forked from it.
#[derive(Debug, Clone)]
pub struct RailControl {
    store: IntervalStore,
    simulator: ScenarioSimulator,
}

impl RailControl {
    pub fn new(store: IntervalStore) -> Self {
        let simulator = ScenarioSimulator::new(store.clone());
        RailControl { store, simulator }
    }

    /// Builds the live schedule from a parsed network file.
    ///
    /// The initial timetable is taken as given: blocks violating constraints or overlapping each other
    /// are loaded and show up as conflicts. Unknown references and empty intervals are rejected.
    pub fn from_dto(dto: NetworkDto, clock: SharedClock) -> Result<Self> {
        let config = ScheduleConfig::try_from(dto.config)?;

        let mut resources = ResourceRegistry::new();
        for resource_dto in dto.resources {
            let resource = Resource::try_from(resource_dto)?;
            let id = resource.id.clone();
            if !resources.add(resource) {
                return Err(Error::ModelConstructionError(format!("Resource {} is defined twice.", id)));
            }
        }

        let mut trains = TrainRegistry::new();
        for train_dto in dto.trains {
            let train = Train::try_from(train_dto)?;
            let id = train.id.clone();
            if !trains.add(train) {
                return Err(Error::ModelConstructionError(format!("Train {} is defined twice.", id)));
            }
        }

        let mut state = ScheduleState::new(resources, trains);
        for block_dto in dto.blocks {
            let interval = block_dto.interval()?;
            ConstraintValidator::validate_interval(&interval).map_err(ScheduleError::from)?;

            let resource_id = ResourceId::new(block_dto.resource_id);
            state.resource(&resource_id)?;
            state.insert_block(&TrainId::new(block_dto.train_id), &resource_id, interval, block_dto.status, false)?;
        }
        state.take_touched();

        Ok(RailControl::new(IntervalStore::new(state, config, clock)))
    }

    pub fn store(&self) -> &IntervalStore {
        &self.store
    }

    pub fn simulator(&self) -> &ScenarioSimulator {
        &self.simulator
    }

    // Queries

    pub fn current_version(&self) -> ScheduleVersion {
        self.store.current_version()
    }

    pub fn list_blocks(&self, filter: &BlockFilter) -> Vec<Block> {
        self.store.list_blocks(filter)
    }

    pub fn list_conflicts(&self) -> Vec<Conflict> {
        self.store.conflicts().as_ref().clone()
    }

    /// Precedence groups and ranked suggestions for the current conflicts.
    pub fn suggestions(&self) -> Arc<Resolution> {
        self.store.resolution()
    }

    // Commands

    pub fn assign(
        &self,
        expected_version: ScheduleVersion,
        train_id: &TrainId,
        resource_id: &ResourceId,
        interval: TimeInterval,
        allow_conflict: bool,
    ) -> std::result::Result<Receipt<BlockId>, ScheduleError> {
        self.store.assign(expected_version, train_id, resource_id, interval, allow_conflict)
    }

    pub fn reschedule(&self, expected_version: ScheduleVersion, block_id: BlockId, interval: TimeInterval, allow_conflict: bool) -> std::result::Result<Receipt<()>, ScheduleError> {
        self.store.reschedule(expected_version, block_id, interval, allow_conflict)
    }

    pub fn move_block(&self, expected_version: ScheduleVersion, block_id: BlockId, resource_id: &ResourceId, allow_conflict: bool) -> std::result::Result<Receipt<()>, ScheduleError> {
        self.store.move_block(expected_version, block_id, resource_id, allow_conflict)
    }

    pub fn release(&self, expected_version: ScheduleVersion, block_id: BlockId) -> std::result::Result<Receipt<Block>, ScheduleError> {
        self.store.release(expected_version, block_id)
    }

    /// Carries out the suggestion for `block_id` as a regular `reschedule` or `move_block`.
    ///
    /// Fails with `Unresolvable` when the chosen part of the suggestion is not available.
    pub fn accept_suggestion(&self, expected_version: ScheduleVersion, block_id: BlockId, choice: SuggestionChoice) -> std::result::Result<Receipt<()>, ScheduleError> {
        let resolution = self.store.resolution();
        let suggestion = resolution.suggestion_for(block_id).ok_or(ScheduleError::NotFound(NotFound::Block(block_id)))?;

        match (choice, suggestion.action, &suggestion.alternative_resource) {
            (SuggestionChoice::Shift, SuggestedAction::Shift { to }, _) => self.store.reschedule(expected_version, block_id, to, false),
            (SuggestionChoice::AlternativeResource, _, Some(resource_id)) => self.store.move_block(expected_version, block_id, resource_id, false),
            _ => Err(ScheduleError::Unresolvable(vec![block_id])),
        }
    }

    // Simulation

    pub fn fork_scenario(&self, base_version: ScheduleVersion, label: impl Into<String>) -> std::result::Result<ScenarioHandle, ScheduleError> {
        self.simulator.fork(base_version, label)
    }

    pub fn apply_perturbation(&self, handle: ScenarioHandle, perturbation: Perturbation) -> std::result::Result<(), ScheduleError> {
        self.simulator.apply(handle, perturbation)
    }

    pub fn evaluate_scenario(&self, handle: ScenarioHandle) -> std::result::Result<ScenarioMetrics, ScheduleError> {
        self.simulator.evaluate(handle)
    }

    pub fn commit_scenario(&self, handle: ScenarioHandle, allow_conflict: bool) -> std::result::Result<ScheduleVersion, ScheduleError> {
        self.simulator.commit(handle, allow_conflict)
    }

    pub fn discard_scenario(&self, handle: ScenarioHandle) -> std::result::Result<(), ScheduleError> {
        self.simulator.discard(handle)
    }

    pub fn save_scenario(&self, handle: ScenarioHandle, name: impl Into<String>) -> std::result::Result<ScenarioResult, ScheduleError> {
        self.simulator.save(handle, name)
    }

    // Export

    pub fn resource_utilization(&self, window: &TimeInterval) -> Vec<ResourceUtilization> {
        resource_utilization(&self.store.snapshot(), window)
    }

    /// Load summary in slots of the configured width.
    pub fn timeline_load(&self, window: &TimeInterval) -> Vec<TimelineSlot> {
        let (state, conflicts, _) = self.store.view();
        timeline_load(&state, &conflicts, window, self.store.config().timeline_slot_minutes)
    }

    pub fn export_resources<W: Write>(&self, writer: W, window: &TimeInterval) -> Result<()> {
        write_resource_utilization(writer, &self.resource_utilization(window))
    }

    pub fn export_scenarios<W: Write>(&self, writer: W) -> Result<()> {
        write_scenario_results(writer, &self.simulator.results())
    }

    pub fn export_timeline<W: Write>(&self, writer: W, window: &TimeInterval) -> Result<()> {
        write_timeline(writer, &self.timeline_load(window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::clock_mock::MockClock;
    use crate::domain::rail_system_model::train::train::{PriorityClass, TrainClass};

    fn control() -> RailControl {
        let mut resources = ResourceRegistry::new();
        resources.add(Resource::platform("P1", 400.0, true, true));
        resources.add(Resource::platform("P2", 400.0, true, true));

        let mut trains = TrainRegistry::new();
        trains.add(Train::new("T1", TrainClass::Express, PriorityClass::High, 200.0, true));
        trains.add(Train::new("T2", TrainClass::Local, PriorityClass::Medium, 120.0, true));

        let store = IntervalStore::new(ScheduleState::new(resources, trains), ScheduleConfig::default(), MockClock::at_unix(0).shared());
        let control = RailControl::new(store);

        control.assign(0, &TrainId::new("T1"), &ResourceId::new("P1"), TimeInterval::hm((14, 0), (16, 30)), false).unwrap();
        control.assign(1, &TrainId::new("T2"), &ResourceId::new("P1"), TimeInterval::hm((16, 0), (17, 0)), true).unwrap();
        control
    }

    #[test]
    fn test_accept_shift_suggestion_clears_conflict() {
        let control = control();
        assert_eq!(control.list_conflicts().len(), 1);

        let receipt = control.accept_suggestion(2, BlockId(2), SuggestionChoice::Shift).unwrap();
        assert_eq!(receipt.version, 3);
        assert!(control.list_conflicts().is_empty());
        assert_eq!(control.store().block(BlockId(2)).unwrap().interval, TimeInterval::hm((16, 30), (17, 30)));
    }

    #[test]
    fn test_accept_alternative_resource() {
        let control = control();

        control.accept_suggestion(2, BlockId(2), SuggestionChoice::AlternativeResource).unwrap();
        assert_eq!(control.store().block(BlockId(2)).unwrap().resource_id, ResourceId::new("P2"));
        assert!(control.list_conflicts().is_empty());
    }

    #[test]
    fn test_accept_without_suggestion_is_not_found() {
        let control = control();

        let error = control.accept_suggestion(2, BlockId(1), SuggestionChoice::Shift).unwrap_err();
        assert_eq!(error, ScheduleError::NotFound(NotFound::Block(BlockId(1))));
    }

    #[test]
    fn test_export_resources_is_reproducible() {
        let control = control();
        let window = TimeInterval::hm((14, 0), (18, 0));

        let mut first = Vec::new();
        let mut second = Vec::new();
        control.export_resources(&mut first, &window).unwrap();
        control.export_resources(&mut second, &window).unwrap();

        assert_eq!(first, second);
        assert_eq!(String::from_utf8(first).unwrap(), "Resource,Utilization (%),Status\nP1,87.5,high\nP2,0.0,low\n");
    }
}
