//! The dispatch queue shared by the dispatcher and the worker pool.
//!
//! # Ordering
//! Tasks leave in the order they were admitted. A batch is appended as one
//! contiguous run under a single lock, so two concurrent submits never
//! interleave.
//!
//! # Waking
//! `dequeue` parks on a `Notify`. The waiter is enabled before the state is
//! inspected, and `enqueue_batch` sends one `notify_one` per item, so an item
//! pushed between the check and the await still wakes someone. `close` uses
//! `notify_waiters` to release every parked worker at once.
//!
//! # Outstanding ids
//! Besides the pending items the queue keeps the set of ids that were
//! admitted and not yet finished. Workers call `mark_finished` when a task
//! is done; `close` drops the ids of tasks it discards. The dispatcher uses
//! this to answer `queued` for a task whose first record is not written yet.
//!
//! # Capacity
//! With `max_pending` set, a batch that does not fit is refused whole with
//! `QueueError::Full`. Nothing ever waits for room.

use std::collections::{HashSet, VecDeque};

use tokio::sync::{Mutex, Notify};

use super::QueueError;
use crate::domain::{PendingTask, TaskId};

struct QueueState {
    pending: VecDeque<PendingTask>,
    /// Admitted and not yet finished by a worker: everything in `pending`
    /// plus whatever is in flight.
    outstanding: HashSet<TaskId>,
    closed: bool,
}

/// Multi-consumer FIFO of pending tasks.
///
/// - `enqueue*` never waits for capacity; with `max_pending` set it rejects
///   instead.
/// - `dequeue` waits until an item arrives or the queue is closed.
/// - Each item is handed to exactly one dequeuer.
/// - An id stays outstanding from admission until `mark_finished`, so a
///   task with no record yet can still be told apart from an unknown one.
///
/// The mutex is only held for the push/pop itself, never across an await on
/// anything else.
pub struct DispatchQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    max_pending: Option<usize>,
}

impl DispatchQueue {
    pub fn unbounded() -> Self {
        Self::with_max_pending(None)
    }

    pub fn with_max_pending(max_pending: Option<usize>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                outstanding: HashSet::new(),
                closed: false,
            }),
            notify: Notify::new(),
            max_pending,
        }
    }

    pub async fn enqueue(&self, task: PendingTask) -> Result<(), QueueError> {
        self.enqueue_batch(vec![task]).await
    }

    /// Append a whole batch, contiguously and in order, or none of it.
    pub async fn enqueue_batch(&self, tasks: Vec<PendingTask>) -> Result<(), QueueError> {
        let admitted = tasks.len();
        {
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(QueueError::Closed);
            }
            if let Some(capacity) = self.max_pending
                && state.pending.len() + admitted > capacity
            {
                return Err(QueueError::Full { capacity });
            }
            state.outstanding.extend(tasks.iter().map(PendingTask::id));
            state.pending.extend(tasks);
        }

        // one wakeup per item; surplus wakeups just find an empty queue
        for _ in 0..admitted {
            self.notify.notify_one();
        }
        Ok(())
    }

    /// Take the head of the queue, waiting if it is empty.
    ///
    /// Returns `None` once the queue is closed.
    pub async fn dequeue(&self) -> Option<PendingTask> {
        loop {
            // register interest before looking, so an enqueue between the
            // check and the await is not missed
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if state.closed {
                    return None;
                }
                if let Some(task) = state.pending.pop_front() {
                    return Some(task);
                }
            }

            notified.await;
        }
    }

    /// Close the queue: wake every waiting dequeuer and refuse new work.
    ///
    /// Tasks still pending are dropped; the number dropped is returned.
    pub async fn close(&self) -> usize {
        let dropped = {
            let mut state = self.state.lock().await;
            state.closed = true;
            let dropped: Vec<PendingTask> = state.pending.drain(..).collect();
            for task in &dropped {
                state.outstanding.remove(&task.id());
            }
            dropped.len()
        };
        self.notify.notify_waiters();
        dropped
    }

    /// Whether `id` was admitted and its worker has not finished with it.
    pub async fn is_outstanding(&self, id: TaskId) -> bool {
        self.state.lock().await.outstanding.contains(&id)
    }

    /// Called by the worker once the task has reached a terminal state.
    pub async fn mark_finished(&self, id: TaskId) {
        self.state.lock().await.outstanding.remove(&id);
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskId;
    use std::sync::Arc;
    use std::time::Duration;
    use ulid::Ulid;

    fn task(prompt: &str) -> PendingTask {
        PendingTask::new(TaskId::from_ulid(Ulid::new()), prompt)
    }

    #[tokio::test]
    async fn preserves_admission_order() {
        let queue = DispatchQueue::unbounded();
        queue.enqueue(task("a")).await.unwrap();
        queue
            .enqueue_batch(vec![task("b"), task("c")])
            .await
            .unwrap();

        assert_eq!(queue.len().await, 3);
        for expected in ["a", "b", "c"] {
            assert_eq!(queue.dequeue().await.unwrap().prompt(), expected);
        }
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn enqueue_wakes_waiting_dequeuer() {
        let queue = Arc::new(DispatchQueue::unbounded());
        let waiter = tokio::spawn({
            let queue = queue.clone();
            async move { queue.dequeue().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let pending = task("late");
        let id = pending.id();
        queue.enqueue(pending).await.unwrap();

        let got = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.map(|t| t.id()), Some(id));
    }

    #[tokio::test]
    async fn each_item_goes_to_exactly_one_dequeuer() {
        let queue = Arc::new(DispatchQueue::unbounded());
        let mut consumers = Vec::new();
        for _ in 0..4 {
            let queue = queue.clone();
            consumers.push(tokio::spawn(async move {
                let mut got = Vec::new();
                while let Some(task) = queue.dequeue().await {
                    got.push(task.id());
                }
                got
            }));
        }

        let tasks: Vec<PendingTask> = (0..200).map(|i| task(&i.to_string())).collect();
        let mut expected: Vec<TaskId> = tasks.iter().map(PendingTask::id).collect();
        queue.enqueue_batch(tasks).await.unwrap();

        while !queue.is_empty().await {
            tokio::task::yield_now().await;
        }
        queue.close().await;

        let mut seen = Vec::new();
        for consumer in consumers {
            seen.extend(consumer.await.unwrap());
        }
        seen.sort();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn close_releases_blocked_and_future_dequeuers() {
        let queue = Arc::new(DispatchQueue::unbounded());
        let blocked: Vec<_> = (0..3)
            .map(|_| {
                let queue = queue.clone();
                tokio::spawn(async move { queue.dequeue().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close().await;

        for handle in blocked {
            let got = tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .unwrap()
                .unwrap();
            assert!(got.is_none());
        }
        assert!(queue.dequeue().await.is_none());
        assert!(queue.is_closed().await);
        assert_eq!(queue.enqueue(task("x")).await, Err(QueueError::Closed));
    }

    #[tokio::test]
    async fn close_reports_dropped_tasks() {
        let queue = DispatchQueue::unbounded();
        queue
            .enqueue_batch(vec![task("a"), task("b")])
            .await
            .unwrap();
        assert_eq!(queue.close().await, 2);
        assert_eq!(queue.len().await, 0);
    }

    #[tokio::test]
    async fn ids_stay_outstanding_until_finished() {
        let queue = DispatchQueue::unbounded();
        let (a, b) = (task("a"), task("b"));
        let (a_id, b_id) = (a.id(), b.id());
        queue.enqueue_batch(vec![a, b]).await.unwrap();

        let taken = queue.dequeue().await.unwrap();
        assert_eq!(taken.id(), a_id);
        // dequeued but not finished
        assert!(queue.is_outstanding(a_id).await);

        queue.mark_finished(a_id).await;
        assert!(!queue.is_outstanding(a_id).await);
        assert!(queue.is_outstanding(b_id).await);

        // dropped at close means no longer outstanding
        assert_eq!(queue.close().await, 1);
        assert!(!queue.is_outstanding(b_id).await);
    }

    #[tokio::test]
    async fn capped_queue_rejects_whole_batch() {
        let queue = DispatchQueue::with_max_pending(Some(3));
        queue
            .enqueue_batch(vec![task("a"), task("b")])
            .await
            .unwrap();

        let err = queue
            .enqueue_batch(vec![task("c"), task("d")])
            .await
            .unwrap_err();
        assert_eq!(err, QueueError::Full { capacity: 3 });
        assert_eq!(queue.len().await, 2);

        queue.enqueue(task("c")).await.unwrap();
        assert_eq!(queue.len().await, 3);
    }
}
