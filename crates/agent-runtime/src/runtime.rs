//! Runtime for constructing agents with dependency injection
//!
//! The AgentRuntime owns the shared resources (the model handle and the tool
//! registry) and turns an [`AgentConfiguration`] into a runnable
//! [`ToolAgent`].

use agent_core::Result;
use agent_llm::LLMProvider;
use agent_tools::ToolRegistry;
use std::sync::Arc;
use tracing::info;

use crate::agents::ToolAgent;
use crate::config::AgentConfiguration;
use crate::executor::{AgentExecutor, ExecutorConfig};

/// Configuration for the agent runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Maximum LLM ⇄ tool iterations for agents created by this runtime
    pub default_max_iterations: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_max_iterations: 10,
        }
    }
}

/// Runtime for constructing agents with dependency injection
///
/// # Example
///
/// ```no_run
/// use agent_runtime::{AgentConfiguration, AgentRuntime};
/// use agent_llm::LLMProvider;
/// use std::sync::Arc;
///
/// # fn example(provider: Arc<dyn LLMProvider>, config: AgentConfiguration) -> agent_core::Result<()> {
/// let runtime = AgentRuntime::builder()
///     .provider(provider)
///     .default_max_iterations(5)
///     .build()?;
///
/// let agent = runtime.create_agent(&config);
/// # Ok(())
/// # }
/// ```
pub struct AgentRuntime {
    provider: Arc<dyn LLMProvider>,
    tool_registry: Arc<ToolRegistry>,
    config: RuntimeConfig,
}

impl AgentRuntime {
    /// Create a new agent runtime
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tool_registry: Arc<ToolRegistry>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            provider,
            tool_registry,
            config,
        }
    }

    /// Create a new runtime builder
    pub fn builder() -> AgentRuntimeBuilder {
        AgentRuntimeBuilder::new()
    }

    /// Build an agent straight from a model handle and a configuration
    ///
    /// The configuration's tools become the agent's only tools.
    pub fn from_configuration(
        model: Arc<dyn LLMProvider>,
        config: AgentConfiguration,
    ) -> ToolAgent {
        Self::new(model, Arc::new(ToolRegistry::new()), RuntimeConfig::default())
            .create_agent(&config)
    }

    /// Get a reference to the LLM provider
    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }

    /// Get a reference to the tool registry
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tool_registry
    }

    /// Get a reference to the runtime configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Create a tool-using agent (with LLM loop and tool execution)
    ///
    /// The agent sees every tool currently in the runtime registry.
    pub fn create_tool_agent(&self, config: ExecutorConfig, name: impl Into<String>) -> ToolAgent {
        let executor =
            AgentExecutor::new(self.provider.clone(), self.tool_registry.clone(), config);
        ToolAgent::new(executor, name)
    }

    /// Create the agent an [`AgentConfiguration`] describes
    ///
    /// Registers the configuration's tools with the runtime registry, then
    /// builds a [`ToolAgent`] with the configured model, system prompt and
    /// display flags.
    pub fn create_agent(&self, config: &AgentConfiguration) -> ToolAgent {
        for tool in &config.tools {
            self.tool_registry.register(tool.clone());
        }

        info!(
            agent = %config.name,
            model = %config.model_id,
            tools = ?config.tool_names(),
            show_tool_calls = config.show_tool_calls,
            output_format = %config.output_format,
            "Creating agent"
        );

        let executor_config = ExecutorConfig {
            max_iterations: self.config.default_max_iterations,
            ..ExecutorConfig::for_agent(config)
        };

        self.create_tool_agent(executor_config, config.name.clone())
            .with_show_tool_calls(config.show_tool_calls)
            .with_output_format(config.output_format)
            .with_render_markdown(config.render_markdown)
    }
}

/// Builder for AgentRuntime
pub struct AgentRuntimeBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    tool_registry: Option<Arc<ToolRegistry>>,
    config: RuntimeConfig,
}

impl AgentRuntimeBuilder {
    /// Create a new runtime builder
    pub fn new() -> Self {
        Self {
            provider: None,
            tool_registry: None,
            config: RuntimeConfig::default(),
        }
    }

    /// Set the LLM provider
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the tool registry
    pub fn tool_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.tool_registry = Some(registry);
        self
    }

    /// Set the runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default max iterations
    pub fn default_max_iterations(mut self, max: usize) -> Self {
        self.config.default_max_iterations = max;
        self
    }

    /// Build the runtime
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is not set
    pub fn build(self) -> Result<AgentRuntime> {
        let provider = self.provider.ok_or_else(|| {
            agent_core::Error::InitializationFailed("Provider not set".to_string())
        })?;

        let tool_registry = self
            .tool_registry
            .unwrap_or_else(|| Arc::new(ToolRegistry::new()));

        Ok(AgentRuntime::new(provider, tool_registry, self.config))
    }
}

impl Default for AgentRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
