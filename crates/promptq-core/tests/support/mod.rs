//! Shared fakes for the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep};
use ulid::Ulid;

use promptq_core::app::{Dispatcher, StatusReport};
use promptq_core::domain::{FieldMap, ProviderError, StoreError, TaskId};
use promptq_core::impls::InMemoryTaskStore;
use promptq_core::ports::{CompletionProvider, CompletionRequest, IdGenerator, TaskRecordStore};

/// In-memory store that also keeps every write, in order.
///
/// Writes of a given status can be refused for a single task id.
pub struct RecordingStore {
    inner: InMemoryTaskStore,
    writes: Mutex<Vec<(TaskId, FieldMap)>>,
    refused: Mutex<Vec<(TaskId, &'static str)>>,
}

impl RecordingStore {
    pub fn new(inner: InMemoryTaskStore) -> Self {
        Self {
            inner,
            writes: Mutex::new(Vec::new()),
            refused: Mutex::new(Vec::new()),
        }
    }

    /// Fail every write for `id` whose status field is one of `statuses`.
    pub fn refuse(self, id: TaskId, statuses: &[&'static str]) -> Self {
        self.refused
            .lock()
            .unwrap()
            .extend(statuses.iter().map(|status| (id, *status)));
        self
    }

    pub fn writes_for(&self, id: TaskId) -> Vec<FieldMap> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(written, _)| *written == id)
            .map(|(_, fields)| fields.clone())
            .collect()
    }

    pub fn progress_for(&self, id: TaskId) -> Vec<u8> {
        self.writes_for(id)
            .iter()
            .filter_map(|fields| fields.get("progress"))
            .map(|p| p.parse().unwrap())
            .collect()
    }
}

#[async_trait]
impl TaskRecordStore for RecordingStore {
    async fn write_fields(&self, id: TaskId, fields: &FieldMap) -> Result<(), StoreError> {
        self.writes.lock().unwrap().push((id, fields.clone()));
        let status = fields.get("status").map(String::as_str);
        let refused = self
            .refused
            .lock()
            .unwrap()
            .iter()
            .any(|(refused_id, refused_status)| *refused_id == id && status == Some(*refused_status));
        if refused {
            return Err(StoreError::backend("write refused"));
        }
        self.inner.write_fields(id, fields).await
    }

    async fn set_expiry(&self, id: TaskId, ttl: Duration) -> Result<(), StoreError> {
        self.inner.set_expiry(id, ttl).await
    }

    async fn read_all_fields(&self, id: TaskId) -> Result<Option<FieldMap>, StoreError> {
        self.inner.read_all_fields(id).await
    }
}

/// Hands out a fixed list of ids first, then fresh ones.
pub struct FixedIds {
    ids: Mutex<VecDeque<TaskId>>,
}

impl FixedIds {
    pub fn new(ids: &[TaskId]) -> Self {
        Self {
            ids: Mutex::new(ids.iter().copied().collect()),
        }
    }
}

impl IdGenerator for FixedIds {
    fn generate_task_id(&self) -> TaskId {
        self.ids
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| TaskId::from_ulid(Ulid::new()))
    }
}

pub fn fresh_id() -> TaskId {
    TaskId::from_ulid(Ulid::new())
}

#[derive(Clone)]
pub enum Script {
    Reply(String),
    Fail(ProviderError),
    /// Panic with this message inside the provider call.
    Panic(String),
}

/// Provider with per-prompt behaviour and a fixed latency. Unscripted
/// prompts are echoed back.
pub struct ScriptedProvider {
    delay: Duration,
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<(String, Instant)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            scripts: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn script(mut self, prompt: &str, script: Script) -> Self {
        self.scripts.insert(prompt.to_string(), script);
        self
    }

    /// Prompts in the order calls started, with their start instants.
    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.prompt.clone(), Instant::now()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match self.scripts.get(&request.prompt) {
            Some(Script::Reply(text)) => Ok(text.clone()),
            Some(Script::Fail(err)) => Err(err.clone()),
            Some(Script::Panic(message)) => panic!("{message}"),
            None => Ok(request.prompt.clone()),
        }
    }
}

/// Poll until every id reports a terminal status.
pub async fn wait_terminal(dispatcher: &Dispatcher, ids: &[TaskId]) -> StatusReport {
    let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
    for _ in 0..10_000 {
        let report = dispatcher.status(&ids).await;
        let done = report
            .iter()
            .all(|(_, view)| view.record().is_some_and(|r| r.status.is_terminal()));
        if done {
            return report;
        }
        sleep(Duration::from_millis(50)).await;
    }
    panic!("tasks did not reach a terminal state");
}
