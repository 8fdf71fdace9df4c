//! Agent bootstrap
//!
//! Builds the web search agent from a [`BootstrapRequest`] and asks it one
//! question. The model client and the runtime are obtained through the
//! [`ModelConnector`] and [`RuntimeConnector`] seams; the binary wires the
//! live Gemini and runtime implementations.

use agent_core::{Credential, Error, Result};
use agent_llm::LLMProvider;
use agent_llm::providers::{GeminiConfig, GeminiProvider, gemini::API_BASE_ENV_VAR};
use agent_runtime::{AgentConfiguration, AgentRuntime, OutputFormat, Responder};
use agent_tools::{DuckDuckGoConfig, DuckDuckGoTool};
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use tracing::info;

/// Name the agent introduces itself with
pub const AGENT_NAME: &str = "Web Search Agent";

/// Model used unless overridden
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Question asked unless overridden
pub const DEFAULT_PROMPT: &str = "Whats happening in Pakistan?";

/// Opens a model client for a model identifier
pub trait ModelConnector: Send + Sync {
    /// Connect to `model_id` authenticating with `credential`
    fn connect(&self, model_id: &str, credential: &Credential) -> Result<Arc<dyn LLMProvider>>;
}

/// Constructs an agent runtime from a model handle and a configuration
pub trait RuntimeConnector: Send + Sync {
    /// Build the runtime that will answer prompts
    fn create(
        &self,
        model: Arc<dyn LLMProvider>,
        config: AgentConfiguration,
    ) -> Result<Box<dyn Responder>>;
}

/// Inputs of one bootstrap run
#[derive(Clone)]
pub struct BootstrapRequest {
    /// Raw model provider credential; validated before anything is built
    pub credential: String,
    /// Question to ask
    pub prompt: String,
    /// Model identifier
    pub model_id: String,
    /// Write the answer as it is generated
    pub stream: bool,
    /// Answer formatting
    pub output_format: OutputFormat,
    /// Echo tool calls to the output
    pub show_tool_calls: bool,
    /// Style markdown answers for a terminal; the output is written raw otherwise
    pub render_markdown: bool,
    /// Pin the number of search results; the model chooses when unset
    pub max_results: Option<usize>,
}

impl BootstrapRequest {
    /// A request with the stock agent settings: default model, streaming,
    /// markdown output and visible tool calls
    pub fn new(credential: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            prompt: prompt.into(),
            model_id: DEFAULT_MODEL.to_string(),
            stream: true,
            output_format: OutputFormat::Markdown,
            show_tool_calls: true,
            render_markdown: false,
            max_results: None,
        }
    }
}

impl fmt::Debug for BootstrapRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapRequest")
            .field("credential", &"***")
            .field("prompt", &self.prompt)
            .field("model_id", &self.model_id)
            .field("stream", &self.stream)
            .field("output_format", &self.output_format)
            .field("show_tool_calls", &self.show_tool_calls)
            .field("render_markdown", &self.render_markdown)
            .field("max_results", &self.max_results)
            .finish()
    }
}

/// Assembles and runs the web search agent
pub struct AgentBootstrap<M, R> {
    models: M,
    runtimes: R,
}

impl<M: ModelConnector, R: RuntimeConnector> AgentBootstrap<M, R> {
    /// Create a bootstrap over the given connectors
    pub fn new(models: M, runtimes: R) -> Self {
        Self { models, runtimes }
    }

    /// Validate the request and build the agent configuration
    ///
    /// Fails with [`Error::Configuration`] for an empty or malformed
    /// credential or an empty prompt. Nothing is connected here.
    pub fn configure(&self, request: &BootstrapRequest) -> Result<AgentConfiguration> {
        if request.prompt.trim().is_empty() {
            return Err(Error::Configuration("prompt must not be empty".to_string()));
        }

        let mut search = DuckDuckGoConfig::default();
        if let Some(limit) = request.max_results {
            search = search.with_fixed_max_results(limit);
        }

        AgentConfiguration::builder(AGENT_NAME)
            .model_id(request.model_id.clone())
            .credential(request.credential.clone())
            .tool(Arc::new(DuckDuckGoTool::new(search)?))
            .show_tool_calls(request.show_tool_calls)
            .output_format(request.output_format)
            .render_markdown(request.render_markdown)
            .build()
    }

    /// Configure the agent, connect it and answer the request's prompt into `out`
    pub async fn run(&self, request: &BootstrapRequest, out: &mut (dyn Write + Send)) -> Result<()> {
        let config = self.configure(request)?;
        info!(
            model = %config.model_id,
            stream = request.stream,
            "Starting web search agent"
        );

        let model = self.models.connect(&config.model_id, &config.credential)?;
        let agent = self.runtimes.create(model, config)?;
        agent.respond(&request.prompt, request.stream, out).await
    }
}

/// Connects to the Gemini API
#[derive(Debug, Clone, Default)]
pub struct GeminiConnector {
    api_base: Option<String>,
}

impl GeminiConnector {
    /// Use the public Gemini endpoint
    pub fn new() -> Self {
        Self::default()
    }

    /// Honour `GEMINI_API_BASE` when it is set
    pub fn from_env() -> Self {
        Self {
            api_base: agent_utils::require_env(API_BASE_ENV_VAR).ok(),
        }
    }

    /// Use a custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }
}

impl ModelConnector for GeminiConnector {
    fn connect(&self, model_id: &str, credential: &Credential) -> Result<Arc<dyn LLMProvider>> {
        let mut config = GeminiConfig::new(credential.clone());
        if let Some(api_base) = &self.api_base {
            config = config.with_api_base(api_base.clone());
        }
        info!(model = model_id, api_base = %config.api_base, "Connecting to Gemini");
        Ok(Arc::new(GeminiProvider::with_config(config)?))
    }
}

/// Builds the in-process [`AgentRuntime`]
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveRuntimeConnector;

impl RuntimeConnector for LiveRuntimeConnector {
    fn create(
        &self,
        model: Arc<dyn LLMProvider>,
        config: AgentConfiguration,
    ) -> Result<Box<dyn Responder>> {
        Ok(Box::new(AgentRuntime::from_configuration(model, config)))
    }
}

/// Process exit status for a run outcome: 0 on success, 1 on any error
pub fn exit_status<T, E>(result: &std::result::Result<T, E>) -> u8 {
    u8::from(result.is_err())
}
