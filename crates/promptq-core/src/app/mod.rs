//! App - dispatch logic built on the ports.
//!
//! # Components
//! - **DispatcherBuilder**: validation and wiring, starts the pool once
//! - **Dispatcher**: ingestion (`submit`) and status (`status`) entry points
//! - **WorkerPool**: fixed set of workers draining the dispatch queue
//! - **TaskLifecycle**: drives one task to a terminal state

pub mod builder;
pub mod dispatcher;
pub mod lifecycle;
pub mod status;
pub mod worker_pool;

pub use self::builder::{BuildError, DispatcherBuilder};
pub use self::dispatcher::{Admission, DispatchError, Dispatcher};
pub use self::lifecycle::TaskLifecycle;
pub use self::status::{StatusReport, TaskView};
pub use self::worker_pool::WorkerPool;
