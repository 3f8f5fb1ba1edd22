//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result, TextStream};
use async_trait::async_trait;
use futures::stream;

/// Trait for LLM providers
///
/// Implementations of this trait provide access to hosted chat-completion
/// services (e.g., Together AI, OpenAI, local OpenAI-compatible servers).
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion from the LLM
    ///
    /// # Arguments
    ///
    /// * `request` - The completion request with messages and parameters
    ///
    /// # Returns
    ///
    /// The completion response with the assistant's message and metadata
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Generate a completion as a stream of text increments
    ///
    /// Errors raised before the first byte (auth, quota, bad request) are
    /// returned directly; errors after that arrive as stream items.
    ///
    /// The default implementation performs a blocking completion and yields
    /// the whole text as a single increment.
    async fn complete_stream(&self, request: CompletionRequest) -> Result<TextStream> {
        let response = self.complete(request).await?;
        let text = response.message.text().unwrap_or_default().to_string();
        Ok(Box::pin(stream::once(async move { Ok(text) })))
    }

    /// Get the provider name (e.g., "together", "openai")
    fn name(&self) -> &str;
}
