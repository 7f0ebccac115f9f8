pub mod conflict;
pub mod conflict_detector;
