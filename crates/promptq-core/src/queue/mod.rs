//! Dispatch queue: the in-memory FIFO between admission and the workers.

mod dispatch;

pub use dispatch::DispatchQueue;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("dispatch queue is closed")]
    Closed,

    #[error("dispatch queue is full (capacity {capacity})")]
    Full { capacity: usize },
}
