use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::rail_system_model::scenario::scenario_metrics::ScenarioMetrics;
use crate::error::ScheduleError;

/// An in-flight scenario evaluation running on the blocking pool.
///
/// Cancellation is cooperative: the task checks the token between perturbations and, when
/// cancelled, restores the fork to its state before the run.
#[derive(Debug)]
pub struct ScenarioRun {
    token: CancellationToken,
    task: JoinHandle<Result<ScenarioMetrics, ScheduleError>>,
}

impl ScenarioRun {
    pub(crate) fn new(token: CancellationToken, task: JoinHandle<Result<ScenarioMetrics, ScheduleError>>) -> Self {
        ScenarioRun { token, task }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the run to finish.
    pub async fn outcome(self) -> Result<ScenarioMetrics, ScheduleError> {
        match self.task.await {
            Ok(result) => result,
            Err(join_error) => {
                log::error!("Scenario run task failed: {}", join_error);
                Err(ScheduleError::Cancelled)
            }
        }
    }
}
