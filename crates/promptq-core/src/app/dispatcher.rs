//! Dispatcher - the ingestion and status entry points.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::status::{StatusReport, TaskView, split_ids};
use super::worker_pool::WorkerPool;
use crate::domain::{PendingTask, TaskId, TaskRecord, TaskStatus};
use crate::ports::{IdGenerator, TaskRecordStore};
use crate::queue::{DispatchQueue, QueueError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Acknowledgement of an admitted batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Admission {
    pub task_ids: Vec<TaskId>,
    pub status: TaskStatus,
}

/// Owns the dispatch queue and the worker pool for the process lifetime.
///
/// Built once by `DispatcherBuilder::start` and shared (`Arc<Dispatcher>`)
/// with whatever transport sits in front of it.
pub struct Dispatcher {
    pub(super) queue: Arc<DispatchQueue>,
    pub(super) pool: Mutex<Option<WorkerPool>>,
    pub(super) store: Arc<dyn TaskRecordStore>,
    pub(super) ids: Arc<dyn IdGenerator>,
    pub(super) worker_count: usize,
}

impl Dispatcher {
    /// Admit a batch of prompts.
    ///
    /// Mints one id per prompt and enqueues the batch; returns as soon as the
    /// batch is queued. Ids come back in prompt order.
    pub async fn submit<I, S>(&self, prompts: I) -> Result<Admission, DispatchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tasks: Vec<PendingTask> = prompts
            .into_iter()
            .map(|prompt| PendingTask::new(self.ids.generate_task_id(), prompt))
            .collect();
        let task_ids: Vec<TaskId> = tasks.iter().map(PendingTask::id).collect();

        if let Err(err) = self.queue.enqueue_batch(tasks).await {
            warn!(batch = task_ids.len(), error = %err, "batch rejected");
            return Err(err.into());
        }
        info!(batch = task_ids.len(), "batch queued");

        Ok(Admission {
            task_ids,
            status: TaskStatus::Queued,
        })
    }

    /// Look up each id independently.
    ///
    /// Admitted tasks with no record yet report `queued`; unknown, expired
    /// and malformed ids report `not_found`; a failed read is reported for
    /// that id only. Duplicate ids are reported once.
    pub async fn status<I, S>(&self, ids: I) -> StatusReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = StatusReport::default();
        let mut seen = HashSet::new();
        for raw in ids {
            let raw = raw.as_ref();
            if !seen.insert(raw.to_string()) {
                continue;
            }
            let view = self.lookup(raw).await;
            report.push(raw.to_string(), view);
        }
        report
    }

    /// `status` over a comma-delimited id list.
    pub async fn status_csv(&self, raw: &str) -> StatusReport {
        self.status(split_ids(raw)).await
    }

    async fn lookup(&self, raw: &str) -> TaskView {
        let Ok(id) = raw.parse::<TaskId>() else {
            return TaskView::NotFound;
        };
        let view = self.read(id).await;
        if view != TaskView::NotFound {
            return view;
        }
        if self.queue.is_outstanding(id).await {
            return TaskView::Queued;
        }
        // the worker may have finished between the read and the check
        self.read(id).await
    }

    async fn read(&self, id: TaskId) -> TaskView {
        let fields = match self.store.read_all_fields(id).await {
            Ok(Some(fields)) => fields,
            Ok(None) => return TaskView::NotFound,
            Err(err) => {
                warn!(task_id = %id, error = %err, "status read failed");
                return TaskView::Unreadable(err.to_string());
            }
        };
        match TaskRecord::from_fields(id, &fields) {
            Ok(record) => TaskView::Found(record),
            Err(err) => {
                warn!(task_id = %id, error = %err, "unreadable record");
                TaskView::Unreadable(err.to_string())
            }
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Number of tasks admitted but not yet picked up by a worker.
    pub async fn pending(&self) -> usize {
        self.queue.len().await
    }

    /// Stop admitting, let in-flight tasks finish, stop the workers.
    ///
    /// Safe to call more than once; later calls return 0. Returns the number
    /// of queued tasks that were dropped.
    pub async fn shutdown(&self) -> usize {
        let pool = self.pool.lock().await.take();
        match pool {
            Some(pool) => pool.shutdown_and_join().await,
            None => 0,
        }
    }
}
