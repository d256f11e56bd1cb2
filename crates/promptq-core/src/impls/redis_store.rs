//! RedisTaskStore - `TaskRecordStore` on a Redis hash per task.
//!
//! | Key | Type | Fields |
//! |-----|------|--------|
//! | `{prefix}:{task_id}` | Hash | `status`, `progress`, `result`, `error` |
//!
//! Writes are `HSET` of the changed fields only, expiry is a plain `EXPIRE`,
//! reads are `HGETALL`. An empty hash means the key is gone.

use std::time::Duration;

use ::redis::AsyncCommands;
use ::redis::aio::MultiplexedConnection;
use async_trait::async_trait;

use crate::domain::{FieldMap, StoreError, TaskId};
use crate::ports::TaskRecordStore;

pub const DEFAULT_KEY_PREFIX: &str = "task";

/// Shares one multiplexed connection; each call works on a cheap clone.
#[derive(Clone)]
pub struct RedisTaskStore {
    conn: MultiplexedConnection,
    key_prefix: String,
}

impl RedisTaskStore {
    /// Connect to `url`, e.g. `redis://localhost:6379/0`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = ::redis::Client::open(url)
            .map_err(|e| StoreError::backend(format!("failed to create Redis client: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::backend(format!("failed to connect to Redis: {e}")))?;
        Ok(Self::with_connection(conn))
    }

    pub fn with_connection(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn key(&self, id: TaskId) -> String {
        record_key(&self.key_prefix, id)
    }
}

fn record_key(prefix: &str, id: TaskId) -> String {
    format!("{prefix}:{id}")
}

fn map_redis_error(err: ::redis::RedisError, key: &str) -> StoreError {
    StoreError::backend(format!("Redis error for key {key}: {err}"))
}

#[async_trait]
impl TaskRecordStore for RedisTaskStore {
    async fn write_fields(&self, id: TaskId, fields: &FieldMap) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }
        let key = self.key(id);
        let items: Vec<(&str, &str)> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let mut conn = self.conn.clone();
        conn.hset_multiple::<_, _, _, ()>(&key, &items)
            .await
            .map_err(|e| map_redis_error(e, &key))
    }

    async fn set_expiry(&self, id: TaskId, ttl: Duration) -> Result<(), StoreError> {
        let key = self.key(id);
        let secs = i64::try_from(ttl.as_secs())
            .map_err(|_| StoreError::backend(format!("ttl out of range for key {key}")))?;
        let mut conn = self.conn.clone();
        conn.expire::<_, ()>(&key, secs)
            .await
            .map_err(|e| map_redis_error(e, &key))
    }

    async fn read_all_fields(&self, id: TaskId) -> Result<Option<FieldMap>, StoreError> {
        let key = self.key(id);
        let mut conn = self.conn.clone();
        let fields: FieldMap = conn
            .hgetall(&key)
            .await
            .map_err(|e| map_redis_error(e, &key))?;
        Ok((!fields.is_empty()).then_some(fields))
    }
}
