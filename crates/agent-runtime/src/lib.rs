//! Agent runtime for the web search agent
//!
//! This crate turns an [`AgentConfiguration`] and a model handle into a
//! runnable agent: the [`AgentExecutor`] drives the LLM ⇄ tool loop, the
//! [`ConsoleRenderer`] writes the answer as it streams in, and
//! [`AgentRuntime`] wires the pieces together.

pub mod agents;
pub mod config;
pub mod executor;
pub mod render;
pub mod runtime;

// Re-export key types
pub use agents::{Responder, ToolAgent};
pub use config::{AgentConfiguration, AgentConfigurationBuilder, OutputFormat};
pub use executor::{
    AgentExecutor, AgentExecutorBuilder, ExecutorConfig, ExecutorEventHandler, NoOpEventHandler,
};
pub use render::ConsoleRenderer;
pub use runtime::{AgentRuntime, AgentRuntimeBuilder, RuntimeConfig};
