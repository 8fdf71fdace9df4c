//! Agent executor for running agent loops
//!
//! The AgentExecutor implements the core agent loop pattern:
//! 1. Call the LLM with conversation history and available tools
//! 2. If tool use was requested, execute the tools and loop back
//! 3. Otherwise return the final answer
//!
//! The loop runs in one of two delivery modes. [`AgentExecutor::run_streaming`]
//! forwards every text delta to the event handler as the provider produces
//! it; [`AgentExecutor::run_with_handler`] waits for each complete turn and
//! forwards its text as a single delta.

use crate::config::AgentConfiguration;
use agent_core::{Error, Result};
use agent_llm::{
    CompletionRequest, ContentBlock, LLMProvider, Message, StopReason, StreamChunk, TokenUsage,
    ToolDefinition,
};
use agent_tools::ToolRegistry;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default model used when none is configured
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Event handler for agent execution events
///
/// Implement this trait to receive callbacks during agent execution,
/// e.g. to render tool calls and answer text to a console.
#[async_trait]
pub trait ExecutorEventHandler: Send + Sync {
    /// Called when a tool execution starts
    async fn on_tool_start(&self, _id: &str, _name: &str, _input: &Value) {}

    /// Called when a tool execution completes
    async fn on_tool_done(
        &self,
        _id: &str,
        _name: &str,
        _result: std::result::Result<&Value, &str>,
        _duration_ms: u64,
    ) {
    }

    /// Called with each piece of answer text, in order
    async fn on_text_delta(&self, _delta: &str) {}

    /// Called when the agent completes
    async fn on_complete(&self, _result: &str) {}

    /// Called when an error occurs
    async fn on_error(&self, _error: &str) {}
}

/// No-op event handler for when events are not needed
pub struct NoOpEventHandler;

#[async_trait]
impl ExecutorEventHandler for NoOpEventHandler {}

/// Configuration for agent execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of iterations (prevents infinite loops)
    pub max_iterations: usize,

    /// Model to use
    pub model: String,

    /// System prompt
    pub system_prompt: Option<String>,

    /// Max tokens per completion
    pub max_tokens: usize,

    /// Temperature
    pub temperature: Option<f32>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            model: DEFAULT_MODEL.to_string(),
            system_prompt: None,
            max_tokens: agent_llm::completion::DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }
}

impl ExecutorConfig {
    /// Executor settings for an agent configuration: its model and system prompt
    pub fn for_agent(config: &AgentConfiguration) -> Self {
        Self {
            model: config.model_id.clone(),
            system_prompt: Some(config.system_prompt()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Blocking,
    Streaming,
}

/// One model turn, however it was delivered
struct Turn {
    message: Message,
    text: String,
    stop_reason: StopReason,
    usage: Option<TokenUsage>,
}

/// Executes an agent loop: LLM → tool calls → execution → loop back
///
/// The AgentExecutor orchestrates the interaction between an LLM provider
/// and a tool registry, implementing the agent loop pattern.
pub struct AgentExecutor {
    provider: Arc<dyn LLMProvider>,
    tool_registry: Arc<ToolRegistry>,
    config: ExecutorConfig,
}

impl AgentExecutor {
    /// Create a new agent executor
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tool_registry: Arc<ToolRegistry>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            provider,
            tool_registry,
            config,
        }
    }

    /// Create a new executor builder
    pub fn builder() -> AgentExecutorBuilder {
        AgentExecutorBuilder::new()
    }

    /// Get the executor configuration
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Get the tool registry
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tool_registry
    }

    /// Execute the agent loop with a user query and no event handler
    ///
    /// Returns the final response after all tool calls are complete.
    pub async fn run(&self, user_message: String) -> Result<String> {
        self.run_with_handler(user_message, &NoOpEventHandler).await
    }

    /// Execute the agent loop, delivering the final answer as one text delta
    pub async fn run_with_handler(
        &self,
        user_message: String,
        handler: &dyn ExecutorEventHandler,
    ) -> Result<String> {
        self.run_loop(user_message, handler, Delivery::Blocking)
            .await
    }

    /// Execute the agent loop over the provider's chunk stream
    ///
    /// Text deltas reach `handler` as soon as the provider yields them.
    pub async fn run_streaming(
        &self,
        user_message: String,
        handler: &dyn ExecutorEventHandler,
    ) -> Result<String> {
        self.run_loop(user_message, handler, Delivery::Streaming)
            .await
    }

    async fn run_loop(
        &self,
        user_message: String,
        handler: &dyn ExecutorEventHandler,
        delivery: Delivery,
    ) -> Result<String> {
        let result = self.drive(user_message, handler, delivery).await;
        if let Err(e) = &result {
            handler.on_error(&e.to_string()).await;
        }
        result
    }

    async fn drive(
        &self,
        user_message: String,
        handler: &dyn ExecutorEventHandler,
        delivery: Delivery,
    ) -> Result<String> {
        let mut conversation = vec![Message::user(user_message)];
        let tools = self.build_tool_definitions();
        debug!(tool_count = tools.len(), "Available tools");

        for iteration in 1..=self.config.max_iterations {
            info!(
                iteration = iteration,
                max_iterations = self.config.max_iterations,
                streaming = delivery == Delivery::Streaming,
                "Agent iteration started"
            );

            let request = self.build_request(&conversation, &tools);
            let turn = match delivery {
                Delivery::Blocking => self.complete_turn(request).await?,
                Delivery::Streaming => self.stream_turn(request, handler).await?,
            };

            info!(
                stop_reason = ?turn.stop_reason,
                input_tokens = turn.usage.map(|u| u.input_tokens),
                output_tokens = turn.usage.map(|u| u.output_tokens),
                "LLM response received"
            );

            // Streaming turns have already delivered their text
            if delivery == Delivery::Blocking && !turn.text.is_empty() {
                handler.on_text_delta(&turn.text).await;
            }

            if turn.message.has_tool_uses() {
                let tool_results = self.execute_tools(&turn.message, handler).await?;
                info!(
                    result_count = tool_results.len(),
                    "Tool execution completed, continuing agent loop"
                );
                conversation.push(turn.message);
                conversation.extend(tool_results);
                continue;
            }

            match turn.stop_reason {
                StopReason::MaxTokens => warn!("Hit max tokens in LLM response; answer truncated"),
                StopReason::StopSequence => debug!("Stop sequence encountered"),
                StopReason::EndTurn | StopReason::ToolUse => {}
            }

            info!(
                iteration = iteration,
                response_length = turn.text.len(),
                "Agent completed"
            );
            handler.on_complete(&turn.text).await;
            return Ok(turn.text);
        }

        warn!(
            max_iterations = self.config.max_iterations,
            "Max iterations reached, stopping"
        );
        Err(Error::ProcessingFailed(format!(
            "max iterations ({}) reached without a final answer",
            self.config.max_iterations
        )))
    }

    fn build_request(&self, conversation: &[Message], tools: &[ToolDefinition]) -> CompletionRequest {
        let mut builder = CompletionRequest::builder(&self.config.model)
            .messages(conversation.to_vec())
            .max_tokens(self.config.max_tokens)
            .tools(tools.to_vec());

        if let Some(system) = &self.config.system_prompt {
            builder = builder.system(system.clone());
        }
        if let Some(temperature) = self.config.temperature {
            builder = builder.temperature(temperature);
        }

        builder.build()
    }

    async fn complete_turn(&self, request: CompletionRequest) -> Result<Turn> {
        let response = self.provider.complete(request).await?;
        let text = response
            .message
            .blocks()
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                _ => None,
            })
            .collect::<String>();

        Ok(Turn {
            message: response.message,
            text,
            stop_reason: response.stop_reason,
            usage: Some(response.usage),
        })
    }

    async fn stream_turn(
        &self,
        request: CompletionRequest,
        handler: &dyn ExecutorEventHandler,
    ) -> Result<Turn> {
        let mut stream = self.provider.stream(request).await?;
        let mut text = String::new();
        let mut tool_uses = Vec::new();
        let mut stop_reason = StopReason::EndTurn;
        let mut usage = None;

        while let Some(chunk) = stream.next().await {
            match chunk? {
                StreamChunk::TextDelta(delta) => {
                    handler.on_text_delta(&delta).await;
                    text.push_str(&delta);
                }
                StreamChunk::ToolUse { id, name, input } => {
                    debug!(tool_name = %name, tool_id = %id, "Tool call streamed");
                    tool_uses.push(ContentBlock::ToolUse { id, name, input });
                }
                StreamChunk::Done {
                    stop_reason: reason,
                    usage: reported,
                } => {
                    stop_reason = reason;
                    usage = reported;
                }
            }
        }

        Ok(Turn {
            message: Message::assistant_blocks(text.clone(), tool_uses),
            text,
            stop_reason,
            usage,
        })
    }

    /// Build tool definitions from the registry
    fn build_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tool_registry
            .list_tools()
            .iter()
            .map(|tool| ToolDefinition::new(tool.name(), tool.description(), tool.input_schema()))
            .collect()
    }

    /// Execute tool calls from an assistant message
    ///
    /// Transport failures abort the run. Any other tool failure, including an
    /// unknown tool name, becomes an error result the model gets to see.
    async fn execute_tools(
        &self,
        message: &Message,
        handler: &dyn ExecutorEventHandler,
    ) -> Result<Vec<Message>> {
        let mut results = Vec::new();

        let tool_uses = message.tool_uses();
        info!(tool_count = tool_uses.len(), "Starting tool execution");

        for tool_use in tool_uses {
            let ContentBlock::ToolUse { id, name, input } = tool_use else {
                continue;
            };

            let input_preview: String = input.to_string().chars().take(500).collect();
            info!(
                tool_name = %name,
                tool_id = %id,
                input_preview = %input_preview,
                "Executing tool"
            );
            handler.on_tool_start(id, name, input).await;

            let Some(tool) = self.tool_registry.get(name) else {
                warn!(tool_name = %name, "Model requested an unknown tool");
                let error = format!("unknown tool '{name}'");
                handler.on_tool_done(id, name, Err(&error), 0).await;
                results.push(Message::tool_error(id.clone(), format!("Error: {error}")));
                continue;
            };

            let start_time = Instant::now();
            let outcome = tool.execute(input.clone()).await;
            let duration_ms = start_time.elapsed().as_millis() as u64;

            match outcome {
                Ok(result) => {
                    let result_str = result.to_string();
                    let result_preview: String = result_str.chars().take(500).collect();
                    info!(
                        tool_name = %name,
                        duration_ms = duration_ms,
                        result_length = result_str.len(),
                        result_preview = %result_preview,
                        "Tool execution succeeded"
                    );
                    handler.on_tool_done(id, name, Ok(&result), duration_ms).await;
                    results.push(Message::tool_result(id.clone(), result_str));
                }
                Err(e) => {
                    let error_str = e.to_string();
                    warn!(
                        tool_name = %name,
                        duration_ms = duration_ms,
                        error = %e,
                        "Tool execution failed"
                    );
                    handler
                        .on_tool_done(id, name, Err(&error_str), duration_ms)
                        .await;

                    if e.is_transport() {
                        return Err(e);
                    }
                    results.push(Message::tool_error(id.clone(), format!("Error: {e}")));
                }
            }
        }

        Ok(results)
    }
}

/// Builder for AgentExecutor
pub struct AgentExecutorBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    tool_registry: Arc<ToolRegistry>,
    config: ExecutorConfig,
}

impl AgentExecutorBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            provider: None,
            tool_registry: Arc::new(ToolRegistry::new()),
            config: ExecutorConfig::default(),
        }
    }

    /// Set the LLM provider
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the tool registry
    pub fn tool_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.tool_registry = registry;
        self
    }

    /// Set the full configuration
    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set maximum iterations
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the system prompt
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Set max tokens
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Build the executor
    pub fn build(self) -> Result<AgentExecutor> {
        let provider = self
            .provider
            .ok_or_else(|| Error::InitializationFailed("Provider not set".to_string()))?;

        Ok(AgentExecutor::new(provider, self.tool_registry, self.config))
    }
}

impl Default for AgentExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted provider and recording handler shared by the runtime tests

    use super::ExecutorEventHandler;
    use agent_llm::{
        CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, StopReason,
        TokenUsage,
    };
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed list of responses and records every request
    pub struct ScriptedProvider {
        responses: Mutex<VecDeque<agent_llm::Result<CompletionResponse>>>,
        pub requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        pub fn new(responses: Vec<agent_llm::Result<CompletionResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn complete(&self, request: CompletionRequest) -> agent_llm::Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LLMError::ProviderError("script exhausted".to_string())))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    pub fn text_response(text: &str) -> agent_llm::Result<CompletionResponse> {
        Ok(CompletionResponse {
            message: Message::assistant(text),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
            },
        })
    }

    pub fn tool_response(id: &str, name: &str, input: Value) -> agent_llm::Result<CompletionResponse> {
        Ok(CompletionResponse {
            message: Message::assistant_blocks(
                "",
                vec![agent_llm::ContentBlock::ToolUse {
                    id: id.to_string(),
                    name: name.to_string(),
                    input,
                }],
            ),
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        })
    }

    /// Records every callback as a readable line
    #[derive(Default)]
    pub struct RecordingHandler {
        pub events: Mutex<Vec<String>>,
    }

    impl RecordingHandler {
        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExecutorEventHandler for RecordingHandler {
        async fn on_tool_start(&self, _id: &str, name: &str, _input: &Value) {
            self.events.lock().unwrap().push(format!("start:{name}"));
        }

        async fn on_tool_done(
            &self,
            _id: &str,
            name: &str,
            result: std::result::Result<&Value, &str>,
            _duration_ms: u64,
        ) {
            let status = if result.is_ok() { "ok" } else { "err" };
            self.events.lock().unwrap().push(format!("done:{name}:{status}"));
        }

        async fn on_text_delta(&self, delta: &str) {
            self.events.lock().unwrap().push(format!("delta:{delta}"));
        }

        async fn on_complete(&self, result: &str) {
            self.events.lock().unwrap().push(format!("complete:{result}"));
        }

        async fn on_error(&self, error: &str) {
            self.events.lock().unwrap().push(format!("error:{error}"));
        }
    }
}
