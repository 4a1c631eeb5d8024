//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// Receives assistant text as it is generated
pub trait TextSink: Send + Sync {
    /// Called with each new piece of text, in order
    fn on_text(&self, delta: &str);
}

impl<F> TextSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_text(&self, delta: &str) {
        self(delta);
    }
}

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion from the model
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Generate a completion, reporting text to `sink` as it arrives
    ///
    /// The returned response holds the full message, identical to what
    /// [`complete`](Self::complete) would return. Providers without native
    /// streaming emit the whole text once.
    async fn complete_streaming(
        &self,
        request: CompletionRequest,
        sink: &dyn TextSink,
    ) -> Result<CompletionResponse> {
        let response = self.complete(request).await?;
        if let Some(text) = response.message.text().filter(|t| !t.is_empty()) {
            sink.on_text(&text);
        }
        Ok(response)
    }

    /// Get the provider name (e.g., "openai", "azure")
    fn name(&self) -> &str;
}
