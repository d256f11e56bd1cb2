use super::TaskId;

/// A queued unit of work: the id plus the prompt it owns.
///
/// This is all the dispatch queue ever holds. It is not an authoritative
/// record; the store only learns about the task once a worker picks it up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTask {
    id: TaskId,
    prompt: String,
}

impl PendingTask {
    pub fn new(id: TaskId, prompt: impl Into<String>) -> Self {
        Self {
            id,
            prompt: prompt.into(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}
