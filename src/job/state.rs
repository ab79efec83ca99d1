use std::fmt;

use serde::{Deserialize, Serialize};

use super::model::JobResult;

/// Lifecycle of a job inside the engine.
///
/// Queued → Running → one of Succeeded / Failed / Cancelled. A job may also go
/// straight from Queued to Cancelled when cancellation lands before a worker
/// picks it up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: JobState) -> bool {
        match (self, next) {
            (Self::Queued, Self::Running) | (Self::Queued, Self::Cancelled) => true,
            (Self::Running, next) => next.is_terminal(),
            _ => false,
        }
    }

    /// Terminal state described by a finished job's result.
    pub fn of_result(result: &JobResult) -> JobState {
        if result.cancelled {
            Self::Cancelled
        } else if result.success {
            Self::Succeeded
        } else {
            Self::Failed
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Queued => write!(f, "QUEUED"),
            JobState::Running => write!(f, "RUNNING"),
            JobState::Succeeded => write!(f, "SUCCEEDED"),
            JobState::Failed => write!(f, "FAILED"),
            JobState::Cancelled => write!(f, "CANCELLED"),
        }
    }
}
