//! TaskRecordStore port: the durable per-task field set.
//!
//! The store is the only authoritative record of a task. Implementations
//! must make `write_fields` an atomic partial update (create if absent,
//! merge otherwise) and honour `set_expiry` by making the record
//! unreadable once the duration has elapsed.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{FieldMap, StoreError, TaskId};

#[async_trait]
pub trait TaskRecordStore: Send + Sync {
    /// Merge `fields` into the record for `id`, creating it if needed.
    async fn write_fields(&self, id: TaskId, fields: &FieldMap) -> Result<(), StoreError>;

    /// Evict the record `ttl` from now.
    async fn set_expiry(&self, id: TaskId, ttl: Duration) -> Result<(), StoreError>;

    /// All fields of the record, or `None` if it never existed or expired.
    async fn read_all_fields(&self, id: TaskId) -> Result<Option<FieldMap>, StoreError>;
}
