//! Tool agent implementation (wraps AgentExecutor)

use super::Responder;
use crate::config::OutputFormat;
use crate::executor::AgentExecutor;
use crate::render::ConsoleRenderer;
use agent_core::Result;
use async_trait::async_trait;
use std::io::Write;
use termimad::MadSkin;
use tracing::{Instrument, info_span, warn};

/// An agent that uses the LLM loop with tool execution
///
/// ToolAgent wraps the AgentExecutor and, as a [`Responder`], renders the
/// answer, and optionally the tool calls, to a writer.
///
/// # Example
///
/// ```no_run
/// use agent_runtime::{AgentConfiguration, AgentRuntime, Responder};
/// use agent_llm::providers::GeminiProvider;
/// use agent_tools::{DuckDuckGoConfig, DuckDuckGoTool};
/// use std::sync::Arc;
///
/// # async fn example() -> agent_core::Result<()> {
/// let config = AgentConfiguration::builder("Web Search Agent")
///     .model_id("gemini-1.5-flash")
///     .credential(std::env::var("GOOGLE_API_KEY").unwrap_or_default())
///     .tool(Arc::new(DuckDuckGoTool::new(DuckDuckGoConfig::default())?))
///     .show_tool_calls(true)
///     .markdown(true)
///     .build()?;
///
/// let model = Arc::new(GeminiProvider::new(config.credential.clone())?);
/// let agent = AgentRuntime::from_configuration(model, config);
/// agent.respond("Whats happening in Pakistan?", true, &mut std::io::stdout()).await?;
/// # Ok(())
/// # }
/// ```
pub struct ToolAgent {
    executor: AgentExecutor,
    name: String,
    show_tool_calls: bool,
    output_format: OutputFormat,
    render_markdown: bool,
}

impl ToolAgent {
    /// Create a new tool agent
    ///
    /// # Arguments
    ///
    /// * `executor` - The agent executor to wrap
    /// * `name` - Name of the agent
    pub fn new(executor: AgentExecutor, name: impl Into<String>) -> Self {
        Self {
            executor,
            name: name.into(),
            show_tool_calls: false,
            output_format: OutputFormat::default(),
            render_markdown: false,
        }
    }

    /// Echo tool invocations when responding
    pub fn with_show_tool_calls(mut self, show: bool) -> Self {
        self.show_tool_calls = show;
        self
    }

    /// Record the format the system prompt asks answers to be in
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Style markdown answers for a terminal when responding
    pub fn with_render_markdown(mut self, render: bool) -> Self {
        self.render_markdown = render;
        self
    }

    /// Get a reference to the underlying executor
    pub fn executor(&self) -> &AgentExecutor {
        &self.executor
    }

    /// Whether tool invocations are echoed
    pub fn show_tool_calls(&self) -> bool {
        self.show_tool_calls
    }

    /// Answer format
    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Agent name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether markdown answers are styled for a terminal
    pub fn render_markdown(&self) -> bool {
        self.render_markdown && self.output_format == OutputFormat::Markdown
    }
}

#[async_trait]
impl Responder for ToolAgent {
    async fn respond(
        &self,
        prompt: &str,
        stream: bool,
        out: &mut (dyn Write + Send),
    ) -> Result<()> {
        let span = info_span!("agent_respond", agent = %self.name, stream);
        let mut renderer = ConsoleRenderer::new(out, self.show_tool_calls);
        if self.render_markdown() {
            renderer = renderer.with_markdown(MadSkin::default());
        }

        let result = if stream {
            self.executor
                .run_streaming(prompt.to_string(), &renderer)
                .instrument(span)
                .await
        } else {
            self.executor
                .run_with_handler(prompt.to_string(), &renderer)
                .instrument(span)
                .await
        };

        // A failed run outranks a failed write
        let written = renderer.finish();
        result?;
        if let Err(e) = &written {
            warn!(error = %e, "Failed to write answer");
        }
        written?;
        Ok(())
    }
}
