//! LLM provider trait definition

use crate::{ChunkStream, CompletionRequest, CompletionResponse, Result, StreamChunk};
use async_trait::async_trait;

/// Trait for LLM providers
///
/// Implementations of this trait provide access to an LLM service. A provider
/// is the model handle the agent runtime is constructed with.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion from the LLM
    ///
    /// # Arguments
    ///
    /// * `request` - The completion request with messages, tools, and parameters
    ///
    /// # Returns
    ///
    /// The completion response with the assistant's message and metadata
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Generate a completion delivered as a stream of chunks
    ///
    /// The default implementation waits for [`complete`](Self::complete) and
    /// replays the finished answer; providers with native streaming override
    /// it.
    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream> {
        let response = self.complete(request).await?;
        let chunks = StreamChunk::from_response(response);
        Ok(Box::pin(futures::stream::iter(chunks.into_iter().map(Ok))))
    }

    /// Get the provider name (e.g., "gemini")
    fn name(&self) -> &str;
}
