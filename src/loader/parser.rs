use serde::de::DeserializeOwned;
use std::fs;

use crate::api::network_dto::NetworkDto;
use crate::api::scenario_dto::ScenarioDto;
use crate::error::{Error, Result};

/// Reads `file_path` and parses it as JSON into `T`.
///
/// - `Error::IoError` if the file cannot be read.
/// - `Error::DeserializationError` if the JSON is malformed or does not match `T`.
pub fn parse_json_file<T: DeserializeOwned>(file_path: &str) -> Result<T> {
    let data = fs::read_to_string(file_path).map_err(|e| Error::IoError(e))?;

    let parsed_data: T = serde_json::from_str(&data).map_err(|e| Error::DeserializationError(e))?;

    Ok(parsed_data)
}

/// Network file: config, resources, trains and the initial timetable.
pub fn load_network(file_path: &str) -> Result<NetworkDto> {
    let network: NetworkDto = parse_json_file(file_path)?;
    log::info!(
        "Network file {} parsed: {} resource(s), {} train(s), {} block(s).",
        file_path,
        network.resources.len(),
        network.trains.len(),
        network.blocks.len()
    );
    Ok(network)
}

/// Scenario file: a label and a list of perturbations.
pub fn load_scenario(file_path: &str) -> Result<ScenarioDto> {
    let scenario: ScenarioDto = parse_json_file(file_path)?;
    log::info!("Scenario file {} parsed: '{}' with {} perturbation(s).", file_path, scenario.label, scenario.perturbations.len());
    Ok(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_network("does/not/exist.json");
        assert!(matches!(result, Err(Error::IoError(_))));
    }

    #[test]
    fn test_malformed_file_is_deserialization_error() {
        let path = std::env::temp_dir().join("railflow_malformed_network.json");
        fs::write(&path, "{ \"resources\": 3 }").unwrap();

        let result = load_network(path.to_str().unwrap());
        assert!(matches!(result, Err(Error::DeserializationError(_))));

        fs::remove_file(path).ok();
    }
}
