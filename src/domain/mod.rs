pub mod clock;
pub mod rail_system_model;
