//! Task records: the typed view of a store field map.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::StoreError;
use super::{TaskId, TaskStatus};

/// Flat string field map, the shape the store persists (one hash per task).
pub type FieldMap = HashMap<String, String>;

pub const FIELD_STATUS: &str = "status";
pub const FIELD_PROGRESS: &str = "progress";
pub const FIELD_RESULT: &str = "result";
pub const FIELD_ERROR: &str = "error";

/// Coarse progress indicator, clamped to 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Progress(u8);

impl Progress {
    pub const START: Progress = Progress(0);
    pub const SUBMITTED: Progress = Progress(25);
    pub const GENERATED: Progress = Progress(75);
    pub const DONE: Progress = Progress(100);

    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Recorded state of one task.
///
/// `result` is only set for `Completed`, `error` only for the two failure
/// states. `progress` may be absent on failure records that were written
/// without ever reaching the store as `Processing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub status: TaskStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskRecord {
    pub fn processing(progress: Progress) -> Self {
        Self {
            status: TaskStatus::Processing,
            progress: Some(progress),
            result: None,
            error: None,
        }
    }

    pub fn completed(result: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Completed,
            progress: Some(Progress::DONE),
            result: Some(result.into()),
            error: None,
        }
    }

    pub fn failed(status: TaskStatus, error: impl Into<String>) -> Self {
        Self {
            status,
            progress: None,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Fields to hand to `TaskRecordStore::write_fields`.
    ///
    /// Only the fields that are set are emitted; the store merges them into
    /// whatever the hash already holds.
    pub fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert(FIELD_STATUS.to_string(), self.status.as_str().to_string());
        if let Some(progress) = self.progress {
            fields.insert(FIELD_PROGRESS.to_string(), progress.to_string());
        }
        if let Some(result) = &self.result {
            fields.insert(FIELD_RESULT.to_string(), result.clone());
        }
        if let Some(error) = &self.error {
            fields.insert(FIELD_ERROR.to_string(), error.clone());
        }
        fields
    }

    /// Rebuild a record from a stored field map. Unknown fields are ignored.
    pub fn from_fields(id: TaskId, fields: &FieldMap) -> Result<Self, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt { id, reason };

        let status = fields
            .get(FIELD_STATUS)
            .ok_or_else(|| corrupt("missing status".to_string()))?
            .parse::<TaskStatus>()
            .map_err(|e| corrupt(e.to_string()))?;

        let progress = fields
            .get(FIELD_PROGRESS)
            .map(|raw| {
                raw.parse::<u8>()
                    .map(Progress::new)
                    .map_err(|e| corrupt(format!("progress {raw:?}: {e}")))
            })
            .transpose()?;

        Ok(Self {
            status,
            progress,
            result: fields.get(FIELD_RESULT).cloned(),
            error: fields.get(FIELD_ERROR).cloned(),
        })
    }
}
