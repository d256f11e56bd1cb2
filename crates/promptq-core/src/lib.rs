//! promptq-core
//!
//! In-process dispatch for slow prompt completions: a shared FIFO queue, a
//! fixed pool of workers draining it, and the per-task lifecycle each worker
//! drives against a durable record store.
//!
//! # Modules
//! - **domain**: ids, task status, task records, errors, lifecycle transitions
//! - **ports**: collaborator traits (TaskRecordStore, CompletionProvider, Clock, IdGenerator)
//! - **queue**: the dispatch queue
//! - **app**: worker pool, lifecycle driver, dispatcher (ingestion + status)
//! - **impls**: adapters (in-memory / Redis store, OpenAI / echo provider)
//! - **config**: process-wide dispatch settings
//!
//! # Flow
//! `Dispatcher::submit` mints one `TaskId` per prompt and appends the batch
//! to the queue in order. Nothing is written to the store at admission. A
//! worker takes the task, and `TaskLifecycle` writes `processing` with
//! progress 0, 25 and 75 before the terminal record (`completed`, `error` or
//! `unexpected_error`). `Dispatcher::status` reads records back; an id that
//! was admitted but has no record yet reads as `queued`.
//!
//! # Guarantees
//! - each admitted task is run by exactly one worker, in admission order
//! - at most `worker_count` provider calls are in flight at once
//! - progress written for a task never decreases
//! - a failing task (provider error, store error, panic) never stops the
//!   worker that ran it
//! - every record that reaches the store carries the TTL from
//!   `DispatchConfig::record_ttl`
//!
//! # Wiring
//! ```ignore
//! let dispatcher = DispatcherBuilder::new(store, provider)
//!     .worker_count(4)
//!     .start()?;
//! let admission = dispatcher.submit(["Hello", "World"]).await?;
//! let report = dispatcher.status(&admission.task_ids).await;
//! ```

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod queue;

pub use app::{Admission, Dispatcher, DispatcherBuilder, StatusReport};
pub use config::{CompletionSettings, DispatchConfig};
pub use domain::{TaskId, TaskRecord, TaskStatus};
