//! Process-wide dispatch settings.

use std::time::Duration;

use serde::Serialize;

use crate::ports::CompletionRequest;

pub const DEFAULT_WORKER_COUNT: usize = 4;
pub const DEFAULT_RECORD_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Model parameters shared by every task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionSettings {
    pub fn request_for(&self, prompt: &str) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".to_string(),
            max_tokens: 100,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    /// Number of workers, and so the cap on concurrent provider calls.
    pub worker_count: usize,

    /// How long a record stays readable once processing has started.
    pub record_ttl: Duration,

    /// Optional cap on tasks waiting in the queue. `None` means unbounded.
    pub max_pending: Option<usize>,

    pub completion: CompletionSettings,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            record_ttl: DEFAULT_RECORD_TTL,
            max_pending: None,
            completion: CompletionSettings::default(),
        }
    }
}
