pub mod perturbation;
pub mod scenario;
pub mod scenario_metrics;
pub mod scenario_result;
pub mod scenario_run;
pub mod scenario_simulator;
