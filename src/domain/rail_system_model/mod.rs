pub mod block;
pub mod conflict;
pub mod constraint;
pub mod export;
pub mod precedence;
pub mod rail_control;
pub mod resource;
pub mod scenario;
pub mod schedule;
pub mod synthetic;
pub mod train;
pub mod utils;
