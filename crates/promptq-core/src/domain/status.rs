//! Task status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Recorded status of a task.
///
/// State transitions:
/// - Queued -> Processing
/// - Processing -> Completed | Error | UnexpectedError
///
/// Queued is never written by the lifecycle driver (the queue is the only
/// place a queued task lives); it exists so callers and views can name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Processing,
    Completed,
    /// The completion provider timed out or failed.
    Error,
    /// Something outside the provider call failed.
    UnexpectedError,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
            TaskStatus::UnexpectedError => "unexpected_error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Error | TaskStatus::UnexpectedError
        )
    }

    /// Whether the lifecycle graph has an edge `self -> next`.
    ///
    /// Re-writing `Processing` (progress milestones) is allowed; nothing
    /// leaves a terminal state. `Queued -> UnexpectedError` covers a store
    /// that failed before the first `Processing` write landed.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        match self {
            TaskStatus::Queued => {
                matches!(next, TaskStatus::Processing | TaskStatus::UnexpectedError)
            }
            TaskStatus::Processing => next != TaskStatus::Queued,
            _ => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(TaskStatus::Queued),
            "processing" => Ok(TaskStatus::Processing),
            "completed" => Ok(TaskStatus::Completed),
            "error" => Ok(TaskStatus::Error),
            "unexpected_error" => Ok(TaskStatus::UnexpectedError),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}
