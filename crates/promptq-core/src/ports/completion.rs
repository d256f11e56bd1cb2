//! CompletionProvider port: the external text-generation service.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::ProviderError;

/// One generate call. Model and sampling parameters are process-wide, only
/// the prompt varies per task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Stateless request/response text generation.
///
/// Implementations own their deadlines: a call that runs out of time must
/// come back as `ProviderError::Timeout` rather than hang.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}
