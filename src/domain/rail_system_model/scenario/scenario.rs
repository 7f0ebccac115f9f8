use std::collections::BTreeSet;

use crate::domain::rail_system_model::block::block::BlockId;
use crate::domain::rail_system_model::precedence::cascade_resolver::{CascadeMemory, CascadeResolver};
use crate::domain::rail_system_model::scenario::perturbation::Perturbation;
use crate::domain::rail_system_model::scenario::scenario_metrics::ScenarioMetrics;
use crate::domain::rail_system_model::schedule::schedule_config::ScheduleConfig;
use crate::domain::rail_system_model::schedule::schedule_state::{ScheduleState, ScheduleVersion};
use crate::domain::rail_system_model::schedule::touch_set::TouchSet;
use crate::domain::rail_system_model::utils::time::TimeInterval;
use crate::error::ScheduleError;

/// An isolated what-if copy of the schedule.
///
/// `base` is the frozen snapshot at `base_version`; `state` accumulates the applied perturbations.
/// Both share all untouched timelines with the live store.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub label: String,
    pub base_version: ScheduleVersion,
    base: ScheduleState,
    state: ScheduleState,
    applied: Vec<Perturbation>,
    memory: CascadeMemory,

    /// Observation window for metrics.
    pub window: TimeInterval,
}

impl Scenario {
    pub fn fork(label: impl Into<String>, base: ScheduleState, window: TimeInterval) -> Self {
        let mut state = base.clone();
        state.take_touched();

        Scenario { label: label.into(), base_version: base.version(), base, state, applied: Vec::new(), memory: CascadeMemory::default(), window }
    }

    pub fn base(&self) -> &ScheduleState {
        &self.base
    }

    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    pub fn applied(&self) -> &[Perturbation] {
        &self.applied
    }

    /// Resources and trains written since the fork.
    pub fn touched(&self) -> &TouchSet {
        self.state.touched()
    }

    pub fn unresolvable(&self) -> &BTreeSet<BlockId> {
        &self.memory.unresolvable
    }

    /// Applies one perturbation and re-resolves what it disturbed, all or nothing.
    pub fn apply(&mut self, perturbation: Perturbation, config: &ScheduleConfig) -> Result<(), ScheduleError> {
        let mut state = self.state.clone();
        let mut memory = self.memory.clone();

        replay(&mut state, &mut memory, &perturbation, config)?;

        log::info!("Scenario '{}': applied {}.", self.label, perturbation);
        self.state = state;
        self.memory = memory;
        self.applied.push(perturbation);
        Ok(())
    }

    pub fn evaluate(&self) -> ScenarioMetrics {
        ScenarioMetrics::measure(&self.state, &self.window, self.memory.unresolvable.len())
    }

    /// Metrics of the untouched base over the same window.
    pub fn baseline(&self) -> ScenarioMetrics {
        ScenarioMetrics::measure(&self.base, &self.window, 0)
    }
}

/// Applies a perturbation to `state` and resolves the resources it disturbed.
///
/// Used both on forks and when a scenario is committed to the live schedule.
pub fn replay(state: &mut ScheduleState, memory: &mut CascadeMemory, perturbation: &Perturbation, config: &ScheduleConfig) -> Result<(), ScheduleError> {
    let dirty = perturbation.apply(state, config)?;
    let moved = CascadeResolver::new(config).resolve(state, dirty, memory)?;

    if moved > 0 {
        log::debug!("{} moved {} block(s) through precedence resolution.", perturbation, moved);
    }
    Ok(())
}
