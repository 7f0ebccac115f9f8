pub mod network_dto;
pub mod scenario_dto;
