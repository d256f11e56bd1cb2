use std::any::Any;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span};

use super::lifecycle::TaskLifecycle;
use crate::queue::DispatchQueue;

/// Fixed-size group of workers draining one `DispatchQueue`.
///
/// - Each worker runs one task at a time, so `size` bounds the number of
///   concurrent provider calls.
/// - Closing the queue is the shutdown signal; `shutdown_and_join` does that
///   and waits for in-flight tasks to finish.
pub struct WorkerPool {
    queue: Arc<DispatchQueue>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers onto the current tokio runtime.
    pub fn spawn(size: usize, queue: Arc<DispatchQueue>, lifecycle: Arc<TaskLifecycle>) -> Self {
        let mut joins = Vec::with_capacity(size);
        for worker_id in 0..size {
            let q = Arc::clone(&queue);
            let lc = Arc::clone(&lifecycle);
            let join = tokio::spawn(
                worker_loop(q, lc).instrument(info_span!("worker", worker_id)),
            );
            joins.push(join);
        }
        info!(workers = size, "worker pool started");

        Self { queue, joins }
    }

    pub fn size(&self) -> usize {
        self.joins.len()
    }

    /// Close the queue and wait for every worker to exit.
    ///
    /// In-flight tasks run to completion; tasks still queued are dropped and
    /// their count returned.
    pub async fn shutdown_and_join(self) -> usize {
        let dropped = self.queue.close().await;
        if dropped > 0 {
            info!(dropped, "queued tasks dropped at shutdown");
        }
        for join in self.joins {
            if let Err(err) = join.await {
                error!(error = %err, "worker exited abnormally");
            }
        }
        info!("worker pool stopped");
        dropped
    }
}

async fn worker_loop(queue: Arc<DispatchQueue>, lifecycle: Arc<TaskLifecycle>) {
    debug!("worker started");
    while let Some(task) = queue.dequeue().await {
        let id = task.id();

        // run on its own task so a panic is contained here instead of
        // taking the worker down with it
        let run = tokio::spawn({
            let lifecycle = Arc::clone(&lifecycle);
            async move { lifecycle.run(task).await }.instrument(info_span!("task", task_id = %id))
        });

        match run.await {
            Ok(status) => debug!(task_id = %id, %status, "task done"),
            Err(err) if err.is_panic() => {
                let message = panic_message(err.into_panic());
                error!(task_id = %id, panic = %message, "task panicked");
                lifecycle.recover_panic(id, message).await;
            }
            Err(err) => error!(task_id = %id, error = %err, "task aborted"),
        }
        queue.mark_finished(id).await;
    }
    debug!("worker stopped");
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
