use crate::domain::clock::clock::SharedClock;
use crate::domain::rail_system_model::rail_control::RailControl;
use crate::error::Result;
use crate::loader::parser::load_network;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Loads a network file and builds the live schedule behind a `RailControl`.
pub fn generate_rail_control(file_path: &str, clock: SharedClock) -> Result<RailControl> {
    let network = load_network(file_path)?;

    let control = RailControl::from_dto(network, clock)?;
    log::info!("Rail model constructed at v{} with {} conflict(s).", control.current_version(), control.list_conflicts().len());

    Ok(control)
}
