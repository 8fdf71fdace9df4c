//! Agent configuration
//!
//! An [`AgentConfiguration`] is assembled once at startup and handed by value
//! to the runtime. It carries everything the runtime needs to build an agent:
//! the model to talk to, the credential for it, the tools the model may call
//! and how the answer should be presented.

use agent_core::{Credential, Error, Result};
use agent_tools::Tool;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How the agent should format its answers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text, no markup
    #[default]
    Plain,
    /// Markdown
    Markdown,
}

impl OutputFormat {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Markdown => "markdown",
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            Self::Plain => "Answer in plain text without any markdown formatting.",
            Self::Markdown => "Use markdown to format your answers.",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to construct an agent
#[derive(Clone)]
pub struct AgentConfiguration {
    /// Human readable agent name
    pub name: String,

    /// Model identifier, e.g. `gemini-1.5-flash`
    pub model_id: String,

    /// Credential for the model provider
    pub credential: Credential,

    /// Tools the model may call
    pub tools: Vec<Arc<dyn Tool>>,

    /// Whether tool invocations are echoed to the output
    pub show_tool_calls: bool,

    /// Answer formatting
    pub output_format: OutputFormat,

    /// Style markdown answers for a terminal instead of writing them raw
    pub render_markdown: bool,
}

impl AgentConfiguration {
    /// Start building a configuration for the named agent
    pub fn builder(name: impl Into<String>) -> AgentConfigurationBuilder {
        AgentConfigurationBuilder::new(name)
    }

    /// Names of the configured tools, in configuration order
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    /// Render the system prompt for this agent
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!("You are {}, a helpful assistant.", self.name);

        if !self.tools.is_empty() {
            prompt.push_str(&format!(
                "\n\nYou have access to the following tools: {}. \
                 Use them whenever the question needs current or external information, \
                 and base your answer on what they return.",
                self.tool_names().join(", ")
            ));
        }

        prompt.push_str("\n\n");
        prompt.push_str(self.output_format.instruction());
        prompt
    }
}

impl fmt::Debug for AgentConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfiguration")
            .field("name", &self.name)
            .field("model_id", &self.model_id)
            .field("credential", &self.credential)
            .field("tools", &self.tool_names())
            .field("show_tool_calls", &self.show_tool_calls)
            .field("output_format", &self.output_format)
            .field("render_markdown", &self.render_markdown)
            .finish()
    }
}

/// Builder for [`AgentConfiguration`]
pub struct AgentConfigurationBuilder {
    name: String,
    model_id: Option<String>,
    credential: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    show_tool_calls: bool,
    output_format: OutputFormat,
    render_markdown: bool,
}

impl AgentConfigurationBuilder {
    /// Create a builder with no model, no credential and no tools
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_id: None,
            credential: None,
            tools: Vec::new(),
            show_tool_calls: false,
            output_format: OutputFormat::default(),
            render_markdown: false,
        }
    }

    /// Set the model identifier
    pub fn model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Set the raw credential; validated by [`build`](Self::build)
    pub fn credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Add a tool
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Replace the tool list
    pub fn tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools = tools;
        self
    }

    /// Echo tool invocations to the output
    pub fn show_tool_calls(mut self, show: bool) -> Self {
        self.show_tool_calls = show;
        self
    }

    /// Set the answer format
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Shorthand for `output_format(Markdown)` / `output_format(Plain)`
    pub fn markdown(self, markdown: bool) -> Self {
        self.output_format(if markdown {
            OutputFormat::Markdown
        } else {
            OutputFormat::Plain
        })
    }

    /// Style markdown answers for a terminal
    ///
    /// Only takes effect with [`OutputFormat::Markdown`].
    pub fn render_markdown(mut self, render: bool) -> Self {
        self.render_markdown = render;
        self
    }

    /// Validate and build the configuration
    ///
    /// Fails with [`Error::Configuration`] when the credential is missing,
    /// empty or malformed, or when the model identifier is empty.
    pub fn build(self) -> Result<AgentConfiguration> {
        let credential = self
            .credential
            .ok_or_else(|| Error::Configuration("credential is required".to_string()))
            .and_then(Credential::new)?;

        let model_id = self
            .model_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| Error::Configuration("model id is required".to_string()))?;

        Ok(AgentConfiguration {
            name: self.name,
            model_id,
            credential,
            tools: self.tools,
            show_tool_calls: self.show_tool_calls,
            output_format: self.output_format,
            render_markdown: self.render_markdown
                && self.output_format == OutputFormat::Markdown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        async fn execute(&self, params: Value) -> Result<Value> {
            Ok(params)
        }

        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the input"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }
    }

    fn builder() -> AgentConfigurationBuilder {
        AgentConfiguration::builder("Test Agent")
            .model_id("gemini-1.5-flash")
            .credential("test-key")
    }

    #[test]
    fn test_build_keeps_fields() {
        let config = builder()
            .tool(Arc::new(EchoTool))
            .show_tool_calls(true)
            .markdown(true)
            .build()
            .unwrap();

        assert_eq!(config.name, "Test Agent");
        assert_eq!(config.model_id, "gemini-1.5-flash");
        assert_eq!(config.credential.expose(), "test-key");
        assert_eq!(config.tool_names(), vec!["echo"]);
        assert!(config.show_tool_calls);
        assert_eq!(config.output_format, OutputFormat::Markdown);
    }

    #[test]
    fn test_defaults() {
        let config = builder().build().unwrap();
        assert!(config.tools.is_empty());
        assert!(!config.show_tool_calls);
        assert_eq!(config.output_format, OutputFormat::Plain);
    }

    #[test]
    fn test_missing_credential() {
        let err = AgentConfiguration::builder("Test Agent")
            .model_id("gemini-1.5-flash")
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_empty_credential() {
        let err = builder().credential("   ").build().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_empty_model_id() {
        let err = builder().model_id("").build().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_debug_redacts_credential() {
        let config = builder().build().unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("test-key"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_system_prompt_markdown_with_tools() {
        let config = builder()
            .tool(Arc::new(EchoTool))
            .markdown(true)
            .build()
            .unwrap();
        let prompt = config.system_prompt();

        assert!(prompt.starts_with("You are Test Agent"));
        assert!(prompt.contains("echo"));
        assert!(prompt.ends_with("Use markdown to format your answers."));
    }

    #[test]
    fn test_system_prompt_plain_without_tools() {
        let prompt = builder().build().unwrap().system_prompt();

        assert!(prompt.starts_with("You are Test Agent, a helpful assistant."));
        assert!(!prompt.contains("tools"));
        assert!(prompt.contains("plain text"));
    }

    #[test]
    fn test_render_markdown_needs_markdown_output() {
        assert!(builder().markdown(true).render_markdown(true).build().unwrap().render_markdown);
        assert!(!builder().markdown(false).render_markdown(true).build().unwrap().render_markdown);
        assert!(!builder().markdown(true).build().unwrap().render_markdown);
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Markdown.to_string(), "markdown");
        assert_eq!(OutputFormat::Plain.to_string(), "plain");
    }
}
