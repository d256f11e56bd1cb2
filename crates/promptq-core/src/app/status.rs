//! Status views returned by the status entry point.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::domain::{TaskRecord, TaskStatus};

pub const NOT_FOUND: &str = "not_found";

/// What a status query reports for one id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskView {
    /// The stored record.
    Found(TaskRecord),

    /// Admitted, no record written yet.
    Queued,

    /// No record: never existed, expired, or dropped at shutdown.
    NotFound,

    /// The record could not be read; reported as data, not as a failure of
    /// the whole query.
    Unreadable(String),
}

impl TaskView {
    /// The `status` string the view serialises with.
    pub fn status(&self) -> &'static str {
        match self {
            TaskView::Found(record) => record.status.as_str(),
            TaskView::Queued => TaskStatus::Queued.as_str(),
            TaskView::NotFound => NOT_FOUND,
            TaskView::Unreadable(_) => TaskStatus::UnexpectedError.as_str(),
        }
    }

    pub fn record(&self) -> Option<&TaskRecord> {
        match self {
            TaskView::Found(record) => Some(record),
            _ => None,
        }
    }
}

impl Serialize for TaskView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TaskView::Found(record) => record.serialize(serializer),
            TaskView::Queued | TaskView::NotFound => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("status", self.status())?;
                map.end()
            }
            TaskView::Unreadable(error) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("status", self.status())?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}

/// Id → view, in request order. Serialises as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    entries: Vec<(String, TaskView)>,
}

impl StatusReport {
    pub(crate) fn push(&mut self, id: String, view: TaskView) {
        self.entries.push((id, view));
    }

    pub fn get(&self, id: &str) -> Option<&TaskView> {
        self.entries
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, view)| view)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TaskView)> {
        self.entries.iter().map(|(id, view)| (id.as_str(), view))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for StatusReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, view) in &self.entries {
            map.serialize_entry(id, view)?;
        }
        map.end()
    }
}

/// Split a comma-delimited id list, dropping blanks.
pub fn split_ids(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|id| !id.is_empty())
}
