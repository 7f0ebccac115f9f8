use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::domain::rail_system_model::block::block::BlockStatus;
use crate::domain::rail_system_model::constraint::constraint_validator::ConstraintValidator;
use crate::domain::rail_system_model::resource::resource::{Resource, ResourceKind};
use crate::domain::rail_system_model::resource::resource_registry::ResourceRegistry;
use crate::domain::rail_system_model::schedule::schedule_state::ScheduleState;
use crate::domain::rail_system_model::train::train::{PriorityClass, Train, TrainClass};
use crate::domain::rail_system_model::train::train_registry::TrainRegistry;
use crate::domain::rail_system_model::utils::time::{Minutes, TimeInterval};
use crate::error::ScheduleError;

/// Shape of a generated network and timetable.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticNetwork {
    pub platforms: usize,
    pub tracks: usize,
    pub trains: usize,

    /// Number of consecutive blocks per train, alternating track and platform.
    pub legs_per_train: usize,

    /// Trains depart inside this window.
    pub window: TimeInterval,
}

impl Default for SyntheticNetwork {
    fn default() -> Self {
        SyntheticNetwork { platforms: 6, tracks: 4, trains: 24, legs_per_train: 3, window: TimeInterval::hm((6, 0), (22, 0)) }
    }
}

/// Builds random but reproducible schedules for demos and load tests.
///
/// Randomness only ever comes from the RNG passed in, so the same seed always yields the same state.
/// Every generated block satisfies the static constraints of its resource; overlaps are left in
/// place for the conflict detector to find.
#[derive(Debug)]
pub struct ScheduleGenerator<'a> {
    rng: &'a mut StdRng,
}

impl<'a> ScheduleGenerator<'a> {
    pub fn new(rng: &'a mut StdRng) -> Self {
        ScheduleGenerator { rng }
    }

    pub fn generate(&mut self, network: &SyntheticNetwork) -> Result<ScheduleState, ScheduleError> {
        let resources = self.resources(network);
        let trains = self.trains(network);

        let mut state = ScheduleState::new(resources, trains);
        let trains: Vec<Train> = state.trains().iter().cloned().collect();

        for train in &trains {
            self.route(&mut state, train, network)?;
        }

        log::info!(
            "Generated synthetic schedule with {} resources, {} trains and {} blocks.",
            state.resources().len(),
            state.trains().len(),
            state.block_count()
        );

        Ok(state)
    }

    fn resources(&mut self, network: &SyntheticNetwork) -> ResourceRegistry {
        let mut registry = ResourceRegistry::new();

        for i in 1..=network.platforms {
            let length = self.rng.random_range(18..=40) as f64 * 10.0;
            registry.add(Resource::platform(format!("P{}", i), length, self.rng.random_bool(0.8), self.rng.random_bool(0.6)));
        }
        for i in 1..=network.tracks {
            registry.add(Resource::track(format!("TR{}", i), 1000.0, self.rng.random_bool(0.7)));
        }

        registry
    }

    fn trains(&mut self, network: &SyntheticNetwork) -> TrainRegistry {
        let mut registry = TrainRegistry::new();

        for i in 1..=network.trains {
            let id = format!("T{:03}", i);
            let train = match self.rng.random_range(0..3) {
                0 => Train::new(id, TrainClass::Express, PriorityClass::High, self.rng.random_range(15..=30) as f64 * 10.0, true),
                1 => Train::new(id, TrainClass::Local, PriorityClass::Medium, self.rng.random_range(6..=18) as f64 * 10.0, self.rng.random_bool(0.7))
                    .with_accessibility(self.rng.random_bool(0.3)),
                _ => Train::new(id, TrainClass::Freight, PriorityClass::Low, self.rng.random_range(30..=60) as f64 * 10.0, false),
            };
            registry.add(train);
        }

        registry
    }

    fn route(&mut self, state: &mut ScheduleState, train: &Train, network: &SyntheticNetwork) -> Result<(), ScheduleError> {
        let latest_departure = (network.window.end - 60).max(network.window.start + 1);
        let mut start: Minutes = self.rng.random_range(network.window.start..latest_departure);

        for leg in 0..network.legs_per_train {
            let preferred = if leg % 2 == 0 { ResourceKind::Track } else { ResourceKind::Platform };

            let compatible: Vec<&Resource> = state.resources().iter().filter(|resource| ConstraintValidator::validate(train, resource).is_ok()).collect();
            let of_kind: Vec<&Resource> = compatible.iter().copied().filter(|resource| resource.kind == preferred).collect();
            let candidates = if of_kind.is_empty() { &compatible } else { &of_kind };

            let Some(resource) = candidates.choose(&mut *self.rng) else {
                log::debug!("No compatible resource for train {} at leg {}, route ends early.", train.id, leg);
                break;
            };
            let resource_id = resource.id.clone();

            let duration: Minutes = match resource.kind {
                ResourceKind::Track => self.rng.random_range(4..=15),
                ResourceKind::Platform => self.rng.random_range(5..=20),
            };

            let interval = TimeInterval::new(start, start + duration);
            state.insert_block(&train.id, &resource_id, interval, BlockStatus::Scheduled, false)?;
            start = interval.end;
        }

        Ok(())
    }
}
