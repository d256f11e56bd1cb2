//! EchoProvider - returns the prompt as the completion.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ProviderError;
use crate::ports::{CompletionProvider, CompletionRequest};

/// Offline provider for local runs and tests. An optional delay stands in
/// for provider latency.
#[derive(Debug, Clone, Default)]
pub struct EchoProvider {
    delay: Option<Duration>,
}

impl EchoProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay) }
    }
}

#[async_trait]
impl CompletionProvider for EchoProvider {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(request.prompt.clone())
    }
}
