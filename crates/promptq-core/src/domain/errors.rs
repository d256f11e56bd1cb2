//! Error types shared by the ports and the lifecycle driver.

use thiserror::Error;

use super::{TaskId, TaskStatus};

/// Failure talking to the task record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store backend error: {message}")]
    Backend { message: String },

    #[error("corrupt record for {id}: {reason}")]
    Corrupt { id: TaskId, reason: String },
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend {
            message: message.into(),
        }
    }
}

/// Failure reported by the completion provider.
///
/// Both variants are expected failure modes of an external dependency and
/// end the task in `error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("completion timed out: {0}")]
    Timeout(String),

    #[error("completion request failed: {0}")]
    Request(String),
}

/// Failure inside the lifecycle driver itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("illegal transition {from} -> {to}")]
    IllegalTransition { from: TaskStatus, to: TaskStatus },
}
