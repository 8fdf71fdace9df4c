//! Concrete agent implementations
//!
//! - [`ToolAgent`]: the LLM loop with tool execution, as a [`Responder`]
//!   that renders to a console

pub mod tool;

pub use tool::ToolAgent;

use agent_core::Result;
use async_trait::async_trait;
use std::io::Write;

/// Answers one prompt by writing the rendered response to `out`
#[async_trait]
pub trait Responder: Send + Sync {
    /// Respond to `prompt`
    ///
    /// With `stream` the answer is written piece by piece as the model
    /// produces it; otherwise it is written once complete.
    async fn respond(&self, prompt: &str, stream: bool, out: &mut (dyn Write + Send))
    -> Result<()>;
}
