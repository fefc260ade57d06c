use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a backfill job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Configuration resolved, cursor placed at the start date
    #[default]
    Initializing,
    /// Processing windows one at a time
    Iterating,
    /// All windows done, flushing the count ledger
    Finalizing,
    /// Job completed successfully
    Done,
    /// Job aborted on an unrecovered error
    Failed,
}

impl JobState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Check if the job is doing work in this state
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Iterating | Self::Finalizing)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Iterating => write!(f, "iterating"),
            Self::Finalizing => write!(f, "finalizing"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initializing" => Ok(Self::Initializing),
            "iterating" => Ok(Self::Iterating),
            "finalizing" => Ok(Self::Finalizing),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid job state: {s}")),
        }
    }
}
