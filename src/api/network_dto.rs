use serde::{Deserialize, Serialize};

use crate::domain::rail_system_model::block::block::BlockStatus;
use crate::domain::rail_system_model::resource::resource::{Resource, ResourceKind, ResourceStatus};
use crate::domain::rail_system_model::schedule::schedule_config::ScheduleConfig;
use crate::domain::rail_system_model::train::train::{PriorityClass, Train, TrainClass};
use crate::domain::rail_system_model::utils::id::ResourceId;
use crate::domain::rail_system_model::utils::time::{TimeInterval, parse_minutes};
use crate::error::Error;

/// Root of a network file: tunables, infrastructure, rolling stock and the initial timetable.
#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDto {
    #[serde(default)]
    pub config: ScheduleConfigDto,
    pub resources: Vec<ResourceDto>,
    pub trains: Vec<TrainDto>,
    #[serde(default)]
    pub blocks: Vec<BlockDto>,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDto {
    pub id: String,
    pub kind: ResourceKind,
    pub length_capacity_meters: f64,
    #[serde(default)]
    pub electrified: bool,
    #[serde(default)]
    pub accessible: bool,
    #[serde(default = "default_resource_status")]
    pub status: ResourceStatus,
}

fn default_resource_status() -> ResourceStatus {
    ResourceStatus::Available
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainDto {
    pub id: String,
    pub class: TrainClass,
    pub priority_class: PriorityClass,
    pub length_meters: f64,
    #[serde(default)]
    pub requires_electrification: bool,
    #[serde(default)]
    pub requires_accessibility: bool,
}

/// A block of the initial timetable. Times are `HH:MM` of the service day.
#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDto {
    pub train_id: String,
    pub resource_id: String,
    pub start: String,
    pub end: String,
    #[serde(default = "default_block_status")]
    pub status: BlockStatus,
}

fn default_block_status() -> BlockStatus {
    BlockStatus::Scheduled
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfigDto {
    #[serde(default = "default_horizon")]
    pub horizon_minutes: i64,
    #[serde(default = "default_day_start")]
    pub service_day_start: String,
    #[serde(default = "default_day_end")]
    pub service_day_end: String,
    #[serde(default)]
    pub safety_buffer_minutes: i64,
    #[serde(default = "default_derate_coefficient")]
    pub derate_coefficient: f64,
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,
    #[serde(default = "default_slot")]
    pub timeline_slot_minutes: i64,
    #[serde(default = "default_cascade_budget")]
    pub cascade_budget: usize,
}

fn default_horizon() -> i64 {
    240
}

fn default_day_start() -> String {
    "00:00".to_string()
}

fn default_day_end() -> String {
    "24:00".to_string()
}

fn default_derate_coefficient() -> f64 {
    0.1
}

fn default_history_depth() -> usize {
    32
}

fn default_slot() -> i64 {
    15
}

fn default_cascade_budget() -> usize {
    256
}

impl Default for ScheduleConfigDto {
    fn default() -> Self {
        ScheduleConfigDto {
            horizon_minutes: default_horizon(),
            service_day_start: default_day_start(),
            service_day_end: default_day_end(),
            safety_buffer_minutes: 0,
            derate_coefficient: default_derate_coefficient(),
            history_depth: default_history_depth(),
            timeline_slot_minutes: default_slot(),
            cascade_budget: default_cascade_budget(),
        }
    }
}

impl TryFrom<ScheduleConfigDto> for ScheduleConfig {
    type Error = Error;

    fn try_from(dto: ScheduleConfigDto) -> Result<Self, Self::Error> {
        let service_day = TimeInterval::new(parse_minutes(&dto.service_day_start)?, parse_minutes(&dto.service_day_end)?);
        if service_day.is_degenerate() {
            return Err(Error::ModelConstructionError(format!("Service day {} is empty.", service_day)));
        }
        if dto.horizon_minutes <= 0 || dto.timeline_slot_minutes <= 0 || dto.safety_buffer_minutes < 0 {
            return Err(Error::ModelConstructionError("Horizon and timeline slot must be positive, safety buffer non-negative.".to_string()));
        }

        Ok(ScheduleConfig {
            horizon_minutes: dto.horizon_minutes,
            service_day,
            safety_buffer_minutes: dto.safety_buffer_minutes,
            derate_coefficient: dto.derate_coefficient,
            history_depth: dto.history_depth,
            timeline_slot_minutes: dto.timeline_slot_minutes,
            cascade_budget: dto.cascade_budget,
        })
    }
}

impl TryFrom<ResourceDto> for Resource {
    type Error = Error;

    fn try_from(dto: ResourceDto) -> Result<Self, Self::Error> {
        if dto.length_capacity_meters.is_nan() || dto.length_capacity_meters <= 0.0 {
            return Err(Error::ModelConstructionError(format!("Resource {} has no usable length.", dto.id)));
        }

        let mut resource = Resource::new(ResourceId::new(dto.id), dto.kind, dto.length_capacity_meters, dto.electrified, dto.accessible);
        resource.status = dto.status;
        Ok(resource)
    }
}

impl TryFrom<TrainDto> for Train {
    type Error = Error;

    fn try_from(dto: TrainDto) -> Result<Self, Self::Error> {
        if dto.length_meters.is_nan() || dto.length_meters <= 0.0 {
            return Err(Error::ModelConstructionError(format!("Train {} has no usable length.", dto.id)));
        }

        Ok(Train::new(dto.id, dto.class, dto.priority_class, dto.length_meters, dto.requires_electrification).with_accessibility(dto.requires_accessibility))
    }
}

impl BlockDto {
    pub fn interval(&self) -> Result<TimeInterval, Error> {
        Ok(TimeInterval::new(parse_minutes(&self.start)?, parse_minutes(&self.end)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_schedule_config() {
        let dto: ScheduleConfigDto = serde_json::from_str("{}").unwrap();
        let config = ScheduleConfig::try_from(dto).unwrap();

        assert_eq!(config, ScheduleConfig::default());
    }

    #[test]
    fn test_network_file_parses() {
        let json = r#"{
            "resources": [
                { "id": "P4", "kind": "platform", "lengthCapacityMeters": 250, "electrified": true, "status": "maintenance" }
            ],
            "trains": [
                { "id": "IC 2024", "class": "express", "priorityClass": "high", "lengthMeters": 200, "requiresElectrification": true }
            ],
            "blocks": [
                { "trainId": "IC 2024", "resourceId": "P4", "start": "14:00", "end": "16:30" }
            ]
        }"#;

        let dto: NetworkDto = serde_json::from_str(json).unwrap();
        let resource = Resource::try_from(dto.resources[0].clone()).unwrap();

        assert_eq!(resource.status, ResourceStatus::Maintenance);
        assert!(!resource.accessible);
        assert_eq!(dto.blocks[0].status, BlockStatus::Scheduled);
        assert_eq!(dto.blocks[0].interval().unwrap(), TimeInterval::hm((14, 0), (16, 30)));
    }

    #[test]
    fn test_empty_service_day_is_rejected() {
        let dto = ScheduleConfigDto { service_day_start: "10:00".to_string(), service_day_end: "09:00".to_string(), ..ScheduleConfigDto::default() };
        assert!(matches!(ScheduleConfig::try_from(dto), Err(Error::ModelConstructionError(_))));
    }
}
