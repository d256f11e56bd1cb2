//! Task lifecycle driver.
//!
//! Runs one task from `queued` to a terminal state. Every step is a write to
//! the record store through a `RecordWriter`, which refuses any edge the
//! status graph does not have.
//!
//! # Stages
//! 1. `processing` at progress 0, then the TTL is started on the record
//! 2. progress 25, the provider call, progress 75 if it answered
//! 3. whatever happened is reduced to a `StageOutcome`, and the `Transition`
//!    it maps to is written as the terminal record
//!
//! # Failure handling
//! Nothing a stage does escapes `run`. A provider failure ends the task as
//! `error`. A store failure or a refused edge ends it as `unexpected_error`:
//! if the terminal write itself fails, one downgrade write is attempted and
//! the outcome goes to the log either way. There is no retry loop.
//!
//! # Expiry
//! The TTL normally starts right after the first `processing` write. When
//! that never happened (the first write or the expire call failed) but a
//! terminal record did land, the TTL is set once more after that write so no
//! record outlives it. Failure of that call is logged, not retried.
//!
//! # Panics
//! A panic inside `run` is caught by the worker pool, which hands it to
//! `recover_panic`. That re-reads the record and leaves terminal ones alone.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::config::CompletionSettings;
use crate::domain::{
    LifecycleError, PendingTask, Progress, StageOutcome, StoreError, TaskId, TaskRecord,
    TaskStatus, transition,
};
use crate::ports::{CompletionProvider, TaskRecordStore};

/// Writes records for one task, refusing edges the lifecycle graph lacks.
struct RecordWriter<'a> {
    store: &'a dyn TaskRecordStore,
    id: TaskId,
    current: TaskStatus,
    ttl: Duration,
    /// Whether `set_expiry` has succeeded for this record.
    expiry_set: bool,
}

impl<'a> RecordWriter<'a> {
    fn new(
        store: &'a dyn TaskRecordStore,
        id: TaskId,
        current: TaskStatus,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            id,
            current,
            ttl,
            expiry_set: false,
        }
    }

    async fn write(&mut self, record: &TaskRecord) -> Result<(), LifecycleError> {
        if !self.current.can_transition_to(record.status) {
            return Err(LifecycleError::IllegalTransition {
                from: self.current,
                to: record.status,
            });
        }
        self.store.write_fields(self.id, &record.to_fields()).await?;
        self.current = record.status;
        Ok(())
    }

    /// Start the TTL window unless it is already running.
    async fn ensure_expiry(&mut self) -> Result<(), StoreError> {
        if !self.expiry_set {
            self.store.set_expiry(self.id, self.ttl).await?;
            self.expiry_set = true;
        }
        Ok(())
    }

    /// `ensure_expiry` for the terminal path, where failure is only logged.
    async fn settle_expiry(&mut self) {
        if let Err(err) = self.ensure_expiry().await {
            error!(task_id = %self.id, error = %err, "failed to set record expiry");
        }
    }
}

pub struct TaskLifecycle {
    store: Arc<dyn TaskRecordStore>,
    provider: Arc<dyn CompletionProvider>,
    settings: CompletionSettings,
    record_ttl: Duration,
}

impl TaskLifecycle {
    pub fn new(
        store: Arc<dyn TaskRecordStore>,
        provider: Arc<dyn CompletionProvider>,
        settings: CompletionSettings,
        record_ttl: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            settings,
            record_ttl,
        }
    }

    /// Drive `task` to a terminal state and return the status it ended in.
    ///
    /// The returned status is what the driver concluded; if the store was
    /// unreachable the record may not reflect it.
    pub async fn run(&self, task: PendingTask) -> TaskStatus {
        let id = task.id();
        let mut writer = RecordWriter::new(
            self.store.as_ref(),
            id,
            TaskStatus::Queued,
            self.record_ttl,
        );

        let outcome = match self.advance(&mut writer, &task).await {
            Ok(outcome) => outcome,
            Err(err) => StageOutcome::from(err),
        };
        self.finish(&mut writer, outcome).await
    }

    async fn advance(
        &self,
        writer: &mut RecordWriter<'_>,
        task: &PendingTask,
    ) -> Result<StageOutcome, LifecycleError> {
        writer.write(&TaskRecord::processing(Progress::START)).await?;
        writer.ensure_expiry().await?;
        debug!(task_id = %task.id(), "processing");

        writer
            .write(&TaskRecord::processing(Progress::SUBMITTED))
            .await?;

        let request = self.settings.request_for(task.prompt());
        match self.provider.generate(&request).await {
            Ok(text) => {
                writer
                    .write(&TaskRecord::processing(Progress::GENERATED))
                    .await?;
                Ok(StageOutcome::Generated(text))
            }
            Err(err) => {
                warn!(task_id = %task.id(), error = %err, "completion failed");
                Ok(StageOutcome::ProviderFailed(err))
            }
        }
    }

    async fn finish(&self, writer: &mut RecordWriter<'_>, outcome: StageOutcome) -> TaskStatus {
        let id = writer.id;
        let target = transition(outcome).record;

        match writer.write(&target).await {
            Ok(()) => {
                writer.settle_expiry().await;
                debug!(task_id = %id, status = %target.status, "task finished");
                target.status
            }
            Err(err) => {
                error!(task_id = %id, status = %target.status, error = %err, "failed to record terminal state");
                if target.status != TaskStatus::UnexpectedError {
                    // one best-effort downgrade, no retry loop
                    let fallback = transition(StageOutcome::from(err)).record;
                    match writer.write(&fallback).await {
                        Ok(()) => writer.settle_expiry().await,
                        Err(err) => {
                            error!(task_id = %id, error = %err, "failed to record unexpected_error");
                        }
                    }
                }
                TaskStatus::UnexpectedError
            }
        }
    }

    /// Record a panic that escaped `run` for `id`.
    ///
    /// The record is read first so a task that already reached a terminal
    /// state is left alone.
    pub async fn recover_panic(&self, id: TaskId, message: String) -> TaskStatus {
        let current = match self.store.read_all_fields(id).await {
            Ok(Some(fields)) => TaskRecord::from_fields(id, &fields)
                .map(|record| record.status)
                .unwrap_or(TaskStatus::Processing),
            Ok(None) => TaskStatus::Queued,
            Err(err) => {
                warn!(task_id = %id, error = %err, "could not read record after panic");
                TaskStatus::Processing
            }
        };
        if current.is_terminal() {
            warn!(task_id = %id, status = %current, "panic after terminal state; record kept");
            return current;
        }

        let mut writer = RecordWriter::new(self.store.as_ref(), id, current, self.record_ttl);
        self.finish(&mut writer, StageOutcome::Panicked(message)).await
    }
}
