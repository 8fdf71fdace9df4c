//! LLM provider abstraction layer for the web search agent
//!
//! This crate provides provider-agnostic abstractions for interacting with
//! Large Language Models (LLMs). It includes:
//!
//! - Message types for LLM communication
//! - Completion request/response types
//! - Stream chunks for incremental delivery
//! - Tool definitions for function calling
//! - Provider trait for LLM implementations
//! - The Gemini provider (behind the `gemini` feature, on by default)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod stream;
pub mod tools;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{ContentBlock, Message, MessageContent, Role};
pub use provider::LLMProvider;
pub use stream::{ChunkStream, StreamChunk};
pub use tools::ToolDefinition;

// Provider implementations
pub mod providers;
