// State machine for the backfill job lifecycle
//
// Initializing -> Iterating -> Finalizing -> Done, with Failed reachable from
// every non-terminal state.

pub mod events;
pub mod job_state_machine;
pub mod states;

pub use events::JobEvent;
pub use job_state_machine::JobStateMachine;
pub use states::JobState;
