use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::rail_system_model::block::block::{BlockId, BlockStatus};
use crate::domain::rail_system_model::constraint::constraint_validator::ConstraintValidator;
use crate::domain::rail_system_model::schedule::placement::{PlacementPolicy, check_placement};
use crate::domain::rail_system_model::schedule::schedule_config::ScheduleConfig;
use crate::domain::rail_system_model::schedule::schedule_state::ScheduleState;
use crate::domain::rail_system_model::train::train::{PriorityClass, Train};
use crate::domain::rail_system_model::utils::id::{ResourceId, TrainId};
use crate::domain::rail_system_model::utils::time::{Minutes, TimeInterval};
use crate::error::ScheduleError;

/// A hypothetical change applied to a scenario fork (and replayed on commit).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Perturbation {
    /// Shift every future block of the train forward by `minutes`.
    DelayTrain { train_id: TrainId, minutes: Minutes },

    /// Replace the train's future block chain by one block per resource, spread evenly over the
    /// span of the old chain.
    RerouteTrain { train_id: TrainId, new_resource_sequence: Vec<ResourceId> },

    /// Introduce a train (or reuse an identical registered one) with one block.
    InsertTrain { train: Train, resource_id: ResourceId, desired_interval: TimeInterval },

    /// Stretch the blocks on the affected resources by `1 + coefficient * severity`.
    WeatherDerate { severity: f64, affected_resource_ids: Vec<ResourceId> },

    Reprioritize { train_id: TrainId, priority_class: PriorityClass },
}

impl fmt::Display for Perturbation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Perturbation::DelayTrain { train_id, minutes } => write!(f, "delay {} by {} min", train_id, minutes),
            Perturbation::RerouteTrain { train_id, new_resource_sequence } => {
                let route: Vec<&str> = new_resource_sequence.iter().map(|id| id.as_str()).collect();
                write!(f, "reroute {} via {}", train_id, route.join(" -> "))
            }
            Perturbation::InsertTrain { train, resource_id, desired_interval } => {
                write!(f, "insert {} on {} {}", train.id, resource_id, desired_interval)
            }
            Perturbation::WeatherDerate { severity, affected_resource_ids } => {
                write!(f, "weather derate severity {} on {} resource(s)", severity, affected_resource_ids.len())
            }
            Perturbation::Reprioritize { train_id, priority_class } => write!(f, "reprioritize {} to {}", train_id, priority_class),
        }
    }
}

impl Perturbation {
    /// Applies the direct effect to `state`, without resolving the conflicts it introduces.
    ///
    /// The caller works on a copy and drops it on error, so a failing perturbation leaves nothing behind.
    ///
    /// # Returns
    /// The resources whose precedence has to be re-resolved.
    pub fn apply(&self, state: &mut ScheduleState, config: &ScheduleConfig) -> Result<BTreeSet<ResourceId>, ScheduleError> {
        match self {
            Perturbation::DelayTrain { train_id, minutes } => Self::delay_train(state, train_id, *minutes),
            Perturbation::RerouteTrain { train_id, new_resource_sequence } => Self::reroute_train(state, train_id, new_resource_sequence),
            Perturbation::InsertTrain { train, resource_id, desired_interval } => Self::insert_train(state, config, train, resource_id, desired_interval),
            Perturbation::WeatherDerate { severity, affected_resource_ids } => Self::weather_derate(state, config, *severity, affected_resource_ids),
            Perturbation::Reprioritize { train_id, priority_class } => {
                state.set_priority(train_id, *priority_class)?;
                Ok(state.blocks_of_train(train_id).into_iter().map(|block| block.resource_id.clone()).collect())
            }
        }
    }

    fn delay_train(state: &mut ScheduleState, train_id: &TrainId, minutes: Minutes) -> Result<BTreeSet<ResourceId>, ScheduleError> {
        if minutes < 0 {
            return Err(ScheduleError::InvalidPerturbation(format!("delay of {} min for train {} is negative", minutes, train_id)));
        }
        state.train(train_id)?;

        let future = Self::future_blocks(state, train_id);
        if future.is_empty() {
            log::warn!("Train {} has no future blocks, delay has no effect.", train_id);
        }

        let mut dirty = BTreeSet::new();
        for id in future {
            let block = state.update_block(id, |block| {
                block.interval = block.interval.shifted(minutes);
                if minutes > 0 {
                    block.status = BlockStatus::Delayed;
                }
            })?;
            dirty.insert(block.resource_id.clone());
        }

        Ok(dirty)
    }

    fn reroute_train(state: &mut ScheduleState, train_id: &TrainId, route: &[ResourceId]) -> Result<BTreeSet<ResourceId>, ScheduleError> {
        if route.is_empty() {
            return Err(ScheduleError::InvalidPerturbation(format!("empty reroute for train {}", train_id)));
        }

        let train = state.train(train_id)?.clone();
        for resource_id in route {
            ConstraintValidator::validate(&train, state.resource(resource_id)?)?;
        }

        let future = Self::future_blocks(state, train_id);
        let (Some(first), Some(last)) = (future.first(), future.last()) else {
            return Err(ScheduleError::InvalidPerturbation(format!("train {} has no future blocks to reroute", train_id)));
        };

        let span = TimeInterval::new(state.require_block(*first)?.start(), state.require_block(*last)?.end());
        let legs = route.len() as Minutes;
        if span.duration() < legs {
            return Err(ScheduleError::InvalidPerturbation(format!("span {} of train {} is too short for {} legs", span, train_id, legs)));
        }

        let mut dirty = BTreeSet::new();
        for id in future {
            dirty.insert(state.remove_block(id)?.resource_id);
        }

        // Even split; the last leg takes the remainder.
        let leg = span.duration() / legs;
        let mut start = span.start;
        for (index, resource_id) in route.iter().enumerate() {
            let end = if index + 1 == route.len() { span.end } else { start + leg };
            state.insert_block(train_id, resource_id, TimeInterval::new(start, end), BlockStatus::Scheduled, false)?;
            dirty.insert(resource_id.clone());
            start = end;
        }

        Ok(dirty)
    }

    fn insert_train(
        state: &mut ScheduleState,
        config: &ScheduleConfig,
        train: &Train,
        resource_id: &ResourceId,
        interval: &TimeInterval,
    ) -> Result<BTreeSet<ResourceId>, ScheduleError> {
        state.add_train(train.clone())?;

        let mut overrides = Vec::new();
        check_placement(state, config, &train.id, resource_id, interval, None, PlacementPolicy::AdmitOverlap, &mut overrides)?;
        state.insert_block(&train.id, resource_id, *interval, BlockStatus::Scheduled, false)?;

        Ok(BTreeSet::from([resource_id.clone()]))
    }

    fn weather_derate(state: &mut ScheduleState, config: &ScheduleConfig, severity: f64, resources: &[ResourceId]) -> Result<BTreeSet<ResourceId>, ScheduleError> {
        if !severity.is_finite() || severity < 0.0 {
            return Err(ScheduleError::InvalidPerturbation(format!("weather severity {} must be a non-negative number", severity)));
        }

        let factor = config.derate_factor(severity);
        let mut dirty = BTreeSet::new();

        for resource_id in resources {
            state.resource(resource_id)?;

            let affected: Vec<BlockId> = state
                .timeline(resource_id)
                .map(|timeline| timeline.iter().filter(|block| block.status != BlockStatus::Completed).map(|block| block.id).collect())
                .unwrap_or_default();

            for id in affected {
                state.update_block(id, |block| {
                    let stretched = ((block.duration() as f64) * factor).round() as Minutes;
                    block.interval = TimeInterval::new(block.start(), block.start() + stretched.max(1));
                })?;
            }

            dirty.insert(resource_id.clone());
        }

        Ok(dirty)
    }

    fn future_blocks(state: &ScheduleState, train_id: &TrainId) -> Vec<BlockId> {
        state.blocks_of_train(train_id).into_iter().filter(|block| block.status.is_future()).map(|block| block.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rail_system_model::resource::resource::Resource;
    use crate::domain::rail_system_model::resource::resource_registry::ResourceRegistry;
    use crate::domain::rail_system_model::train::train::TrainClass;
    use crate::domain::rail_system_model::train::train_registry::TrainRegistry;

    fn state() -> ScheduleState {
        let mut resources = ResourceRegistry::new();
        resources.add(Resource::platform("P1", 400.0, true, true));
        resources.add(Resource::track("TA", 800.0, true));
        resources.add(Resource::track("TB", 800.0, true));
        resources.add(Resource::track("TX", 800.0, false));

        let mut trains = TrainRegistry::new();
        trains.add(Train::new("T1", TrainClass::Express, PriorityClass::High, 200.0, true));

        ScheduleState::new(resources, trains)
    }

    fn place(state: &mut ScheduleState, resource: &str, interval: TimeInterval) -> BlockId {
        state.insert_block(&TrainId::new("T1"), &ResourceId::new(resource), interval, BlockStatus::Scheduled, false).unwrap()
    }

    #[test]
    fn test_weather_derate_multiplies_durations() {
        let mut state = state();
        let a = place(&mut state, "TA", TimeInterval::new(600, 660));
        let b = place(&mut state, "TA", TimeInterval::new(700, 710));

        let derate = Perturbation::WeatherDerate { severity: 3.0, affected_resource_ids: vec![ResourceId::new("TA")] };
        let dirty = derate.apply(&mut state, &ScheduleConfig::default()).unwrap();

        assert_eq!(dirty, BTreeSet::from([ResourceId::new("TA")]));
        assert_eq!(state.require_block(a).unwrap().interval, TimeInterval::new(600, 678));
        assert_eq!(state.require_block(b).unwrap().interval, TimeInterval::new(700, 713));
    }

    #[test]
    fn test_reroute_spreads_span_over_new_resources() {
        let mut state = state();
        place(&mut state, "P1", TimeInterval::new(600, 620));
        place(&mut state, "TA", TimeInterval::new(620, 661));

        let reroute = Perturbation::RerouteTrain { train_id: TrainId::new("T1"), new_resource_sequence: vec![ResourceId::new("TB"), ResourceId::new("P1")] };
        reroute.apply(&mut state, &ScheduleConfig::default()).unwrap();

        let legs: Vec<(String, TimeInterval)> =
            state.blocks_of_train(&TrainId::new("T1")).iter().map(|block| (block.resource_id.to_string(), block.interval)).collect();
        assert_eq!(legs, vec![("TB".to_string(), TimeInterval::new(600, 630)), ("P1".to_string(), TimeInterval::new(630, 661))]);
    }

    #[test]
    fn test_reroute_onto_incompatible_resource_fails() {
        let mut state = state();
        place(&mut state, "TA", TimeInterval::new(600, 660));

        let reroute = Perturbation::RerouteTrain { train_id: TrainId::new("T1"), new_resource_sequence: vec![ResourceId::new("TX")] };
        assert!(matches!(reroute.apply(&mut state, &ScheduleConfig::default()), Err(ScheduleError::ConstraintViolation(_))));
    }

    #[test]
    fn test_insert_train_with_different_spec_is_duplicate() {
        let mut state = state();
        let imposter = Train::new("T1", TrainClass::Freight, PriorityClass::Low, 500.0, false);

        let insert = Perturbation::InsertTrain { train: imposter, resource_id: ResourceId::new("TA"), desired_interval: TimeInterval::new(0, 30) };
        assert_eq!(insert.apply(&mut state, &ScheduleConfig::default()), Err(ScheduleError::DuplicateTrain(TrainId::new("T1"))));
    }

    #[test]
    fn test_negative_delay_is_rejected() {
        let mut state = state();
        let delay = Perturbation::DelayTrain { train_id: TrainId::new("T1"), minutes: -5 };
        assert!(matches!(delay.apply(&mut state, &ScheduleConfig::default()), Err(ScheduleError::InvalidPerturbation(_))));
    }
}
