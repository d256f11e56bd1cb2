//! Domain model (ids, status, records, errors, transitions).

pub mod errors;
pub mod ids;
pub mod record;
pub mod status;
pub mod task;
pub mod transition;

pub use errors::{LifecycleError, ProviderError, StoreError};
pub use ids::{IdParseError, TaskId};
pub use record::{FieldMap, Progress, TaskRecord};
pub use status::TaskStatus;
pub use task::PendingTask;
pub use transition::{StageOutcome, Transition, transition};
