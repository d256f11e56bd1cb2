//! InMemoryTaskStore - a process-local `TaskRecordStore`.
//!
//! Used by tests and by `PROMPTQ_STORE=memory` for local runs. Expiry is
//! measured against an injected `Clock`; expired entries read as absent and
//! are purged on the next access.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{FieldMap, StoreError, TaskId};
use crate::ports::{Clock, SystemClock, TaskRecordStore};

struct Entry {
    fields: FieldMap,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

pub struct InMemoryTaskStore {
    entries: Mutex<HashMap<TaskId, Entry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of live (unexpired) records.
    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| !entry.is_expired(now));
        entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskRecordStore for InMemoryTaskStore {
    async fn write_fields(&self, id: TaskId, fields: &FieldMap) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        if entries.get(&id).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(&id);
        }
        let entry = entries.entry(id).or_insert_with(|| Entry {
            fields: FieldMap::new(),
            expires_at: None,
        });
        entry
            .fields
            .extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn set_expiry(&self, id: TaskId, ttl: Duration) -> Result<(), StoreError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StoreError::backend(format!("ttl out of range: {e}")))?;
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        // like EXPIRE, a missing key is left alone
        if let Some(entry) = entries.get_mut(&id)
            && !entry.is_expired(now)
        {
            entry.expires_at = Some(now + ttl);
        }
        Ok(())
    }

    async fn read_all_fields(&self, id: TaskId) -> Result<Option<FieldMap>, StoreError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        match entries.get(&id) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(&id);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.fields.clone())),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use chrono::TimeZone;
    use ulid::Ulid;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn writes_merge_fields() {
        let store = InMemoryTaskStore::new();
        let id = TaskId::from_ulid(Ulid::new());

        store
            .write_fields(id, &fields(&[("status", "processing"), ("progress", "0")]))
            .await
            .unwrap();
        store
            .write_fields(id, &fields(&[("progress", "25")]))
            .await
            .unwrap();

        let got = store.read_all_fields(id).await.unwrap().unwrap();
        assert_eq!(got, fields(&[("status", "processing"), ("progress", "25")]));
    }

    #[tokio::test]
    async fn missing_record_reads_as_none() {
        let store = InMemoryTaskStore::new();
        let id = TaskId::from_ulid(Ulid::new());
        assert_eq!(store.read_all_fields(id).await.unwrap(), None);
        // expiry on a missing key is a no-op
        store.set_expiry(id, Duration::from_secs(1)).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn record_vanishes_after_ttl() {
        let clock = clock();
        let store = InMemoryTaskStore::with_clock(clock.clone());
        let id = TaskId::from_ulid(Ulid::new());

        store
            .write_fields(id, &fields(&[("status", "completed")]))
            .await
            .unwrap();
        store.set_expiry(id, Duration::from_secs(60)).await.unwrap();

        clock.advance(chrono::Duration::seconds(59));
        assert!(store.read_all_fields(id).await.unwrap().is_some());

        clock.advance(chrono::Duration::seconds(1));
        assert!(store.read_all_fields(id).await.unwrap().is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn later_writes_keep_the_ttl() {
        let clock = clock();
        let store = InMemoryTaskStore::with_clock(clock.clone());
        let id = TaskId::from_ulid(Ulid::new());

        store
            .write_fields(id, &fields(&[("status", "processing")]))
            .await
            .unwrap();
        store.set_expiry(id, Duration::from_secs(10)).await.unwrap();
        store
            .write_fields(id, &fields(&[("status", "completed")]))
            .await
            .unwrap();

        clock.advance(chrono::Duration::seconds(10));
        assert!(store.read_all_fields(id).await.unwrap().is_none());
    }
}
