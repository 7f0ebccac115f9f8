use serde::{Deserialize, Serialize};

use crate::api::network_dto::TrainDto;
use crate::domain::rail_system_model::scenario::perturbation::Perturbation;
use crate::domain::rail_system_model::train::train::{PriorityClass, Train};
use crate::domain::rail_system_model::utils::id::{ResourceId, TrainId};
use crate::domain::rail_system_model::utils::time::{TimeInterval, parse_minutes};
use crate::error::Error;

/// A what-if batch: one label and the perturbations to apply in order.
#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDto {
    pub label: String,
    pub perturbations: Vec<PerturbationDto>,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PerturbationDto {
    DelayTrain { train_id: String, minutes: i64 },
    RerouteTrain { train_id: String, new_resource_sequence: Vec<String> },
    InsertTrain { train: TrainDto, resource_id: String, start: String, end: String },
    WeatherDerate { severity: f64, affected_resource_ids: Vec<String> },
    Reprioritize { train_id: String, priority_class: PriorityClass },
}

impl TryFrom<PerturbationDto> for Perturbation {
    type Error = Error;

    fn try_from(dto: PerturbationDto) -> Result<Self, Self::Error> {
        let perturbation = match dto {
            PerturbationDto::DelayTrain { train_id, minutes } => Perturbation::DelayTrain { train_id: TrainId::new(train_id), minutes },
            PerturbationDto::RerouteTrain { train_id, new_resource_sequence } => Perturbation::RerouteTrain {
                train_id: TrainId::new(train_id),
                new_resource_sequence: new_resource_sequence.into_iter().map(ResourceId::new).collect(),
            },
            PerturbationDto::InsertTrain { train, resource_id, start, end } => Perturbation::InsertTrain {
                train: Train::try_from(train)?,
                resource_id: ResourceId::new(resource_id),
                desired_interval: TimeInterval::new(parse_minutes(&start)?, parse_minutes(&end)?),
            },
            PerturbationDto::WeatherDerate { severity, affected_resource_ids } => {
                Perturbation::WeatherDerate { severity, affected_resource_ids: affected_resource_ids.into_iter().map(ResourceId::new).collect() }
            }
            PerturbationDto::Reprioritize { train_id, priority_class } => Perturbation::Reprioritize { train_id: TrainId::new(train_id), priority_class },
        };

        Ok(perturbation)
    }
}

impl ScenarioDto {
    pub fn perturbations(self) -> Result<Vec<Perturbation>, Error> {
        self.perturbations.into_iter().map(Perturbation::try_from).collect()
    }
}
