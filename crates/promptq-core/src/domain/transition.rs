//! Terminal transitions of the task lifecycle.
//!
//! The driver runs its stages and reduces whatever happened to a single
//! `StageOutcome`; `transition` then maps that outcome to the terminal
//! record to write. Keeping this a pure function makes every edge of the
//! lifecycle graph testable without a store or a provider.

use super::errors::{LifecycleError, ProviderError, StoreError};
use super::{TaskRecord, TaskStatus};

/// What happened while a task was being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The provider returned generated text.
    Generated(String),

    /// The provider timed out or the request failed.
    ProviderFailed(ProviderError),

    /// A store write failed before a terminal state was reached.
    StoreFailed(StoreError),

    /// The lifecycle refused to proceed (e.g. an illegal transition).
    Aborted(LifecycleError),

    /// The task run panicked.
    Panicked(String),
}

impl From<LifecycleError> for StageOutcome {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Store(err) => StageOutcome::StoreFailed(err),
            other => StageOutcome::Aborted(other),
        }
    }
}

/// The terminal write derived from a `StageOutcome`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub record: TaskRecord,
}

impl Transition {
    pub fn status(&self) -> TaskStatus {
        self.record.status
    }
}

pub fn transition(outcome: StageOutcome) -> Transition {
    let record = match outcome {
        StageOutcome::Generated(text) => TaskRecord::completed(text),
        StageOutcome::ProviderFailed(err) => TaskRecord::failed(TaskStatus::Error, err.to_string()),
        StageOutcome::StoreFailed(err) => {
            TaskRecord::failed(TaskStatus::UnexpectedError, err.to_string())
        }
        StageOutcome::Aborted(err) => {
            TaskRecord::failed(TaskStatus::UnexpectedError, err.to_string())
        }
        StageOutcome::Panicked(message) => {
            TaskRecord::failed(TaskStatus::UnexpectedError, format!("worker panicked: {message}"))
        }
    };
    Transition { record }
}
