use tracing::{debug, warn};

use super::{events::JobEvent, states::JobState};
use crate::error::{BackfillError, BackfillResult};

/// In-memory state machine for one backfill run.
///
/// ```text
/// Initializing --Start--> Iterating --WindowsExhausted--> Finalizing --Finalized--> Done
///       \                     |                               |
///        +-------Fail---------+------------Fail---------------+----> Failed
/// ```
#[derive(Debug, Clone, Default)]
pub struct JobStateMachine {
    state: JobState,
    failure: Option<String>,
}

impl JobStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_state(&self) -> JobState {
        self.state
    }

    /// Error message recorded when the job failed
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Apply `event`, returning the new state.
    pub fn transition(&mut self, event: JobEvent) -> BackfillResult<JobState> {
        let target = determine_target_state(self.state, &event)?;

        debug!(
            from = %self.state,
            to = %target,
            event = event.event_type(),
            "Job state transition"
        );

        if let JobEvent::Fail(message) = event {
            self.failure = Some(message);
        }
        self.state = target;
        Ok(target)
    }

    /// Move to `Failed` from wherever the job is. A job that already finished
    /// keeps its terminal state.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        if let Err(e) = self.transition(JobEvent::Fail(message)) {
            warn!(state = %self.state, error = %e, "Ignoring failure event in terminal state");
        }
    }
}

fn determine_target_state(current: JobState, event: &JobEvent) -> BackfillResult<JobState> {
    let target = match (current, event) {
        (JobState::Initializing, JobEvent::Start) => JobState::Iterating,
        (JobState::Iterating, JobEvent::WindowsExhausted) => JobState::Finalizing,
        (JobState::Finalizing, JobEvent::Finalized) => JobState::Done,

        // Failed is reachable from every non-terminal state
        (from, JobEvent::Fail(_)) if !from.is_terminal() => JobState::Failed,

        (from, event) => {
            return Err(BackfillError::StateTransitionError(format!(
                "cannot apply {} in state {from}",
                event.event_type()
            )))
        }
    };
    Ok(target)
}
