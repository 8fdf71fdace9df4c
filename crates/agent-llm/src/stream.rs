//! Incremental completion delivery
//!
//! A streamed completion is a sequence of [`StreamChunk`]s: text deltas and
//! tool calls in the order the model produced them, terminated by a single
//! `Done` chunk.

use crate::{CompletionResponse, ContentBlock, Result, StopReason, TokenUsage};
use futures::stream::BoxStream;
use serde_json::Value;

/// Boxed stream of completion chunks
pub type ChunkStream = BoxStream<'static, Result<StreamChunk>>;

/// One unit of a streamed completion
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// Partial assistant text
    TextDelta(String),

    /// A complete tool call requested by the model
    ToolUse {
        /// Unique ID for this tool use
        id: String,
        /// Tool name
        name: String,
        /// Tool input parameters (JSON)
        input: Value,
    },

    /// End of the completion
    Done {
        /// Why generation stopped
        stop_reason: StopReason,
        /// Token usage, when the provider reports it
        usage: Option<TokenUsage>,
    },
}

impl StreamChunk {
    /// Split a finished completion into the chunks a stream would have carried
    pub fn from_response(response: CompletionResponse) -> Vec<Self> {
        let mut chunks: Vec<Self> = response
            .message
            .blocks()
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } if !text.is_empty() => Some(Self::TextDelta(text)),
                ContentBlock::ToolUse { id, name, input } => Some(Self::ToolUse { id, name, input }),
                _ => None,
            })
            .collect();

        chunks.push(Self::Done {
            stop_reason: response.stop_reason,
            usage: Some(response.usage),
        });
        chunks
    }
}
