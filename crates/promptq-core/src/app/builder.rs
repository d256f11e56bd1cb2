//! DispatcherBuilder - wiring and startup validation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::info;

use super::dispatcher::Dispatcher;
use super::lifecycle::TaskLifecycle;
use super::worker_pool::WorkerPool;
use crate::config::{CompletionSettings, DispatchConfig};
use crate::ports::{CompletionProvider, IdGenerator, SystemClock, TaskRecordStore, UlidGenerator};
use crate::queue::DispatchQueue;

/// BuildError is returned when the configuration cannot produce a working
/// dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("worker_count must be at least 1")]
    InvalidWorkerCount,

    #[error("record_ttl must be at least one second")]
    InvalidTtl,

    #[error("max_pending must be at least 1 when set")]
    InvalidCapacity,
}

/// Builds a `Dispatcher` and starts its worker pool.
///
/// ```ignore
/// let dispatcher = DispatcherBuilder::new(store, provider)
///     .worker_count(4)
///     .start()?;
/// ```
///
/// `start` is the only place a pool is spawned, so one builder yields exactly
/// one pool; there is no lazy start on first submission.
pub struct DispatcherBuilder {
    config: DispatchConfig,
    store: Arc<dyn TaskRecordStore>,
    provider: Arc<dyn CompletionProvider>,
    ids: Option<Arc<dyn IdGenerator>>,
}

impl DispatcherBuilder {
    pub fn new(store: Arc<dyn TaskRecordStore>, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            config: DispatchConfig::default(),
            store,
            provider,
            ids: None,
        }
    }

    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn worker_count(mut self, worker_count: usize) -> Self {
        self.config.worker_count = worker_count;
        self
    }

    pub fn record_ttl(mut self, record_ttl: Duration) -> Self {
        self.config.record_ttl = record_ttl;
        self
    }

    pub fn max_pending(mut self, max_pending: Option<usize>) -> Self {
        self.config.max_pending = max_pending;
        self
    }

    pub fn completion(mut self, completion: CompletionSettings) -> Self {
        self.config.completion = completion;
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    fn validate(&self) -> Result<(), BuildError> {
        if self.config.worker_count == 0 {
            return Err(BuildError::InvalidWorkerCount);
        }
        if self.config.record_ttl < Duration::from_secs(1) {
            return Err(BuildError::InvalidTtl);
        }
        if self.config.max_pending == Some(0) {
            return Err(BuildError::InvalidCapacity);
        }
        Ok(())
    }

    /// Validate, build the queue, spawn the pool. Must run inside a tokio
    /// runtime.
    pub fn start(self) -> Result<Dispatcher, BuildError> {
        self.validate()?;
        let DispatchConfig {
            worker_count,
            record_ttl,
            max_pending,
            completion,
        } = self.config;

        let queue = Arc::new(DispatchQueue::with_max_pending(max_pending));
        let lifecycle = Arc::new(TaskLifecycle::new(
            Arc::clone(&self.store),
            self.provider,
            completion,
            record_ttl,
        ));
        let pool = WorkerPool::spawn(worker_count, Arc::clone(&queue), lifecycle);
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(SystemClock)));

        info!(
            workers = worker_count,
            ttl_secs = record_ttl.as_secs(),
            max_pending = ?max_pending,
            "dispatcher started"
        );

        Ok(Dispatcher {
            queue,
            pool: Mutex::new(Some(pool)),
            store: self.store,
            ids,
            worker_count,
        })
    }
}
