#![allow(dead_code)]

use railflow_core::domain::clock::clock_mock::MockClock;
use railflow_core::domain::rail_system_model::rail_control::RailControl;
use railflow_core::domain::rail_system_model::resource::resource::Resource;
use railflow_core::domain::rail_system_model::resource::resource_registry::ResourceRegistry;
use railflow_core::domain::rail_system_model::schedule::interval_store::IntervalStore;
use railflow_core::domain::rail_system_model::schedule::schedule_config::ScheduleConfig;
use railflow_core::domain::rail_system_model::schedule::schedule_state::ScheduleState;
use railflow_core::domain::rail_system_model::train::train::{PriorityClass, Train, TrainClass};
use railflow_core::domain::rail_system_model::train::train_registry::TrainRegistry;
use railflow_core::domain::rail_system_model::utils::id::{ResourceId, TrainId};

/// 2024-03-01T14:00:00Z
pub const FIXED_TIME: i64 = 1_709_301_600;

/// Two platforms, an electrified and a diesel-only track, four trains.
pub fn state() -> ScheduleState {
    let mut resources = ResourceRegistry::new();
    resources.add(Resource::platform("P1", 400.0, true, true));
    resources.add(Resource::platform("P2", 400.0, true, true));
    resources.add(Resource::track("TA", 800.0, true));
    resources.add(Resource::track("TX", 800.0, false));

    let mut trains = TrainRegistry::new();
    trains.add(Train::new("T1", TrainClass::Express, PriorityClass::High, 200.0, true));
    trains.add(Train::new("T2", TrainClass::Local, PriorityClass::Medium, 120.0, false));
    trains.add(Train::new("T3", TrainClass::Freight, PriorityClass::Low, 500.0, false));
    trains.add(Train::new("T4", TrainClass::Local, PriorityClass::Medium, 120.0, false));

    ScheduleState::new(resources, trains)
}

pub fn store_with(config: ScheduleConfig) -> IntervalStore {
    IntervalStore::new(state(), config, MockClock::at_unix(FIXED_TIME).shared())
}

pub fn store() -> IntervalStore {
    store_with(ScheduleConfig::default())
}

pub fn control() -> RailControl {
    RailControl::new(store())
}

pub fn train(id: &str) -> TrainId {
    TrainId::new(id)
}

pub fn resource(id: &str) -> ResourceId {
    ResourceId::new(id)
}
