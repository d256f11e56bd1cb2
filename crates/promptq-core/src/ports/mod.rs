//! Ports - traits for the collaborators the dispatcher talks to.
//!
//! The core only ever sees these traits; concrete stores and providers live
//! in `impls`.

pub mod clock;
pub mod completion;
pub mod id_generator;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::completion::{CompletionProvider, CompletionRequest};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::task_store::TaskRecordStore;
