//! Google Gemini provider implementation
//!
//! This module implements the LLMProvider trait for Gemini models through the
//! Generative Language REST API.
//! See: https://ai.google.dev/api/generate-content
//!
//! # Example
//!
//! ```no_run
//! use agent_core::Credential;
//! use agent_llm::{CompletionRequest, LLMProvider, Message};
//! use agent_llm::providers::GeminiProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api_key = Credential::new(std::env::var("GOOGLE_API_KEY")?)?;
//!     let provider = GeminiProvider::new(api_key)?;
//!
//!     let request = CompletionRequest::builder("gemini-1.5-flash")
//!         .add_message(Message::user("Hello!"))
//!         .build();
//!
//!     let response = provider.complete(request).await?;
//!     println!("{}", response.message.text().unwrap_or_default());
//!     Ok(())
//! }
//! ```

use super::sse::SseDecoder;
use crate::{
    ChunkStream, CompletionRequest, CompletionResponse, ContentBlock, LLMError, LLMProvider,
    Message, Result, Role, StopReason, StreamChunk, TokenUsage, ToolDefinition,
};
use agent_core::Credential;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Environment variables checked, in order, for the API key
pub const API_KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Environment variable overriding the API base URL
pub const API_BASE_ENV_VAR: &str = "GEMINI_API_BASE";

/// Configuration for Gemini provider
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key for authentication
    pub api_key: Credential,

    /// Base URL for the API (default: "https://generativelanguage.googleapis.com/v1beta")
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl GeminiConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: Credential) -> Self {
        Self {
            api_key,
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Gemini provider
///
/// Supports the Gemini model family, e.g. `gemini-1.5-flash`,
/// `gemini-1.5-pro` and `gemini-2.0-flash`. Streaming uses
/// `streamGenerateContent` with server-sent events.
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
    call_ids: Arc<CallIds>,
}

impl GeminiProvider {
    /// Create a new Gemini provider with custom configuration
    pub fn with_config(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            call_ids: Arc::new(CallIds::default()),
        })
    }

    /// Create a new Gemini provider with API key and default settings
    pub fn new(api_key: Credential) -> Result<Self> {
        Self::with_config(GeminiConfig::new(api_key))
    }

    /// Get the current configuration
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{model}:{method}", self.config.api_base)
    }

    async fn send(&self, url: &str, body: &GeminiRequest, model: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, self.config.api_key.expose())
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(status_error(status, error_text, model));
        }

        Ok(response)
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        validate_model(&request.model)?;
        debug!("Sending request to Gemini API at {}", self.config.api_base);

        let body = GeminiRequest::from_request(&request);
        let url = self.endpoint(&request.model, "generateContent");
        let response = self.send(&url, &body, &request.model).await?;

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        let response = parse_response(gemini_response, &self.call_ids)?;
        debug!(
            "Received response - stop_reason: {:?}, tokens: {}/{}",
            response.stop_reason, response.usage.input_tokens, response.usage.output_tokens
        );
        Ok(response)
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream> {
        validate_model(&request.model)?;
        debug!("Opening Gemini stream at {}", self.config.api_base);

        let body = GeminiRequest::from_request(&request);
        let url = self.endpoint(&request.model, "streamGenerateContent?alt=sse");
        let response = self.send(&url, &body, &request.model).await?;

        Ok(Box::pin(decode_stream(
            response.bytes_stream(),
            Arc::clone(&self.call_ids),
        )))
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

fn validate_model(model: &str) -> Result<()> {
    if model.trim().is_empty() {
        return Err(LLMError::ConfigurationError(
            "model identifier must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn status_error(status: StatusCode, error_text: String, model: &str) -> LLMError {
    match status.as_u16() {
        400 if error_text.contains("API_KEY_INVALID") => LLMError::AuthenticationFailed,
        401 | 403 => LLMError::AuthenticationFailed,
        429 => LLMError::RateLimitExceeded(error_text),
        400 => LLMError::InvalidRequest(error_text),
        404 => LLMError::ModelNotFound(model.to_string()),
        _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
    }
}

/// Turn an SSE byte stream into completion chunks
fn decode_stream<S, B>(bytes: S, call_ids: Arc<CallIds>) -> impl Stream<Item = Result<StreamChunk>> + Send + 'static
where
    S: Stream<Item = reqwest::Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send,
{
    async_stream::try_stream! {
        let mut bytes = Box::pin(bytes);
        let mut decoder = SseDecoder::new();
        let mut state = ResponseState::default();

        while let Some(next) = bytes.next().await {
            let next = next?;
            for event in decoder.push(next.as_ref()) {
                for chunk in state.accept_event(&event, &call_ids)? {
                    yield chunk;
                }
            }
        }
        if let Some(event) = decoder.finish() {
            for chunk in state.accept_event(&event, &call_ids)? {
                yield chunk;
            }
        }

        let (stop_reason, usage) = state.finish();
        yield StreamChunk::Done { stop_reason, usage };
    }
}

fn parse_response(response: GeminiResponse, call_ids: &CallIds) -> Result<CompletionResponse> {
    if response.candidates.is_empty() && response.blocked_reason().is_none() {
        return Err(LLMError::UnexpectedResponse(
            "No candidates in response".to_string(),
        ));
    }

    let mut state = ResponseState::default();
    let mut text = String::new();
    let mut tool_uses = Vec::new();
    for chunk in state.accept(response, call_ids)? {
        match chunk {
            StreamChunk::TextDelta(delta) => text.push_str(&delta),
            StreamChunk::ToolUse { id, name, input } => {
                tool_uses.push(ContentBlock::ToolUse { id, name, input });
            }
            StreamChunk::Done { .. } => {}
        }
    }

    let (stop_reason, usage) = state.finish();
    Ok(CompletionResponse {
        message: Message::assistant_blocks(text, tool_uses),
        stop_reason,
        usage: usage.unwrap_or_default(),
    })
}

/// Gemini does not always return call ids; synthesize unique ones so tool
/// results can be matched back to their call.
#[derive(Debug, Default)]
struct CallIds(AtomicU64);

impl CallIds {
    fn next(&self, name: &str) -> String {
        format!("{name}-{}", self.0.fetch_add(1, Ordering::Relaxed))
    }
}

/// Accumulates finish reason and usage across response fragments
#[derive(Debug, Default)]
struct ResponseState {
    finish_reason: Option<String>,
    usage: Option<TokenUsage>,
    saw_tool_use: bool,
}

impl ResponseState {
    fn accept_event(&mut self, event: &str, call_ids: &CallIds) -> Result<Vec<StreamChunk>> {
        let response: GeminiResponse = serde_json::from_str(event).map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse stream event: {e}"))
        })?;
        self.accept(response, call_ids)
    }

    fn accept(&mut self, response: GeminiResponse, call_ids: &CallIds) -> Result<Vec<StreamChunk>> {
        if let Some(reason) = response.blocked_reason() {
            return Err(LLMError::ProviderError(format!("Prompt blocked: {reason}")));
        }
        if let Some(usage) = response.usage_metadata {
            self.usage = Some(TokenUsage {
                input_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
            });
        }

        let mut chunks = Vec::new();
        // Only one candidate is requested
        if let Some(candidate) = response.candidates.into_iter().next() {
            if let Some(reason) = candidate.finish_reason {
                self.finish_reason = Some(reason);
            }
            let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
            for part in parts {
                if part.thought == Some(true) {
                    continue;
                }
                if let Some(text) = part.text.filter(|t| !t.is_empty()) {
                    chunks.push(StreamChunk::TextDelta(text));
                }
                if let Some(call) = part.function_call {
                    self.saw_tool_use = true;
                    let id = call.id.unwrap_or_else(|| call_ids.next(&call.name));
                    chunks.push(StreamChunk::ToolUse {
                        id,
                        name: call.name,
                        input: call.args,
                    });
                }
            }
        }
        Ok(chunks)
    }

    fn finish(self) -> (StopReason, Option<TokenUsage>) {
        let stop_reason = if self.saw_tool_use {
            StopReason::ToolUse
        } else {
            match self.finish_reason.as_deref() {
                Some("MAX_TOKENS") => StopReason::MaxTokens,
                Some("STOP") | None => StopReason::EndTurn,
                Some(other) => {
                    debug!("Unmapped finish reason: {}", other);
                    StopReason::EndTurn
                }
            }
        };
        (stop_reason, self.usage)
    }
}

// Gemini-specific request/response types
// These match the generateContent wire format

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    generation_config: GenerationConfig,
}

impl GeminiRequest {
    fn from_request(request: &CompletionRequest) -> Self {
        let (contents, mut system_texts) = build_contents(&request.messages);
        if let Some(system) = &request.system {
            system_texts.insert(0, system.clone());
        }

        let system_instruction = (!system_texts.is_empty()).then(|| GeminiContent {
            role: None,
            parts: vec![GeminiPart::text(system_texts.join("\n\n"))],
        });

        let tools = request.tools.as_ref().map(|tools| {
            vec![GeminiTool {
                function_declarations: tools.iter().map(FunctionDeclaration::from).collect(),
            }]
        });

        Self {
            contents,
            system_instruction,
            tools,
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
                stop_sequences: request.stop_sequences.clone(),
            },
        }
    }
}

/// Convert conversation messages, returning contents and any system texts
fn build_contents(messages: &[Message]) -> (Vec<GeminiContent>, Vec<String>) {
    // functionResponse is matched by name, not id
    let call_names: HashMap<String, String> = messages
        .iter()
        .flat_map(Message::blocks)
        .filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, .. } => Some((id, name)),
            _ => None,
        })
        .collect();

    let mut contents: Vec<GeminiContent> = Vec::new();
    let mut system_texts = Vec::new();

    for message in messages {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "model",
            Role::System => {
                if let Some(text) = message.text() {
                    system_texts.push(text.to_string());
                }
                continue;
            }
        };

        let parts: Vec<GeminiPart> = message
            .blocks()
            .into_iter()
            .map(|block| match block {
                ContentBlock::Text { text } => GeminiPart::text(text),
                ContentBlock::ToolUse { name, input, .. } => GeminiPart {
                    function_call: Some(FunctionCall {
                        id: None,
                        name,
                        args: input,
                    }),
                    ..GeminiPart::default()
                },
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => {
                    let value = serde_json::from_str::<Value>(&content)
                        .unwrap_or(Value::String(content));
                    let response = if is_error == Some(true) {
                        json!({ "error": value })
                    } else {
                        json!({ "result": value })
                    };
                    GeminiPart {
                        function_response: Some(FunctionResponse {
                            name: call_names.get(&tool_use_id).cloned().unwrap_or(tool_use_id),
                            response,
                        }),
                        ..GeminiPart::default()
                    }
                }
            })
            .collect();

        if parts.is_empty() {
            continue;
        }

        // Consecutive turns of one role are merged (e.g. several tool results)
        match contents.last_mut() {
            Some(last) if last.role.as_deref() == Some(role) => last.parts.extend(parts),
            _ => contents.push(GeminiContent {
                role: Some(role.to_string()),
                parts,
            }),
        }
    }

    (contents, system_texts)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

impl GeminiPart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

impl From<&ToolDefinition> for FunctionDeclaration {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.input_schema.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

impl GeminiResponse {
    fn blocked_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> Credential {
        Credential::new("test-key").unwrap()
    }

    #[test]
    fn test_provider_creation() {
        let provider = GeminiProvider::new(test_key()).unwrap();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.config().api_base, DEFAULT_GEMINI_API_BASE);
        assert_eq!(
            provider.endpoint("gemini-1.5-flash", "generateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_config_builder_trims_base() {
        let config = GeminiConfig::new(test_key())
            .with_api_base("http://localhost:8080/v1beta/")
            .with_timeout(30);
        assert_eq!(config.api_base, "http://localhost:8080/v1beta");
        assert_eq!(config.timeout_secs, 30);
        assert!(!format!("{config:?}").contains("test-key"));
    }

    #[test]
    fn test_request_mapping() {
        let request = CompletionRequest::builder("gemini-1.5-flash")
            .system("You are a search agent.")
            .add_message(Message::user("Whats happening in Pakistan?"))
            .add_message(Message::assistant_blocks(
                "",
                vec![ContentBlock::ToolUse {
                    id: "call-7".to_string(),
                    name: "duckduckgo_search".to_string(),
                    input: json!({"query": "Pakistan news"}),
                }],
            ))
            .add_message(Message::tool_result(
                "call-7".to_string(),
                r#"[{"title":"Headline"}]"#.to_string(),
            ))
            .tools(vec![ToolDefinition::new(
                "duckduckgo_search",
                "Search the web",
                json!({"type": "object"}),
            )])
            .max_tokens(512)
            .temperature(0.2)
            .build();

        let body = serde_json::to_value(GeminiRequest::from_request(&request)).unwrap();

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "You are a search agent."
        );
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(
            body["contents"][1]["parts"][0]["functionCall"]["name"],
            "duckduckgo_search"
        );
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["name"],
            "duckduckgo_search"
        );
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["response"]["result"][0]["title"],
            "Headline"
        );
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "duckduckgo_search"
        );
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 512);
    }

    #[test]
    fn test_tool_results_are_merged_and_errors_wrapped() {
        let messages = vec![
            Message::user("q"),
            Message::tool_result("a".to_string(), "plain text".to_string()),
            Message::tool_error("b".to_string(), "Error: offline".to_string()),
        ];
        let (contents, system) = build_contents(&messages);
        assert!(system.is_empty());
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].parts.len(), 3);

        let error = contents[0].parts[2].function_response.as_ref().unwrap();
        assert_eq!(error.name, "b");
        assert_eq!(error.response, json!({"error": "Error: offline"}));
    }

    #[test]
    fn test_parse_text_response() {
        let raw = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Pakistan is "}, {"text": "busy."}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 4}
        });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let parsed = parse_response(response, &CallIds::default()).unwrap();

        assert_eq!(parsed.message.text(), Some("Pakistan is busy."));
        assert_eq!(parsed.stop_reason, StopReason::EndTurn);
        assert_eq!(parsed.usage.total(), 16);
    }

    #[test]
    fn test_parse_function_call_response() {
        let raw = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"functionCall": {"name": "duckduckgo_search", "args": {"query": "Pakistan"}}}
                ]},
                "finishReason": "STOP"
            }]
        });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let parsed = parse_response(response, &CallIds::default()).unwrap();

        assert_eq!(parsed.stop_reason, StopReason::ToolUse);
        let uses = parsed.message.tool_uses();
        assert_eq!(uses.len(), 1);
        match uses[0] {
            ContentBlock::ToolUse { id, name, input } => {
                assert_eq!(id, "duckduckgo_search-0");
                assert_eq!(name, "duckduckgo_search");
                assert_eq!(input["query"], "Pakistan");
            }
            other => panic!("unexpected block: {other:?}"),
        }
    }

    #[test]
    fn test_parse_max_tokens_and_empty() {
        let raw = json!({
            "candidates": [{"content": {"parts": [{"text": "cut"}]}, "finishReason": "MAX_TOKENS"}]
        });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let parsed = parse_response(response, &CallIds::default()).unwrap();
        assert_eq!(parsed.stop_reason, StopReason::MaxTokens);

        let empty: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            parse_response(empty, &CallIds::default()),
            Err(LLMError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_blocked_prompt() {
        let raw = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let err = parse_response(response, &CallIds::default()).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "API_KEY_INVALID".to_string(), "m"),
            LLMError::AuthenticationFailed
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "bad field".to_string(), "m"),
            LLMError::InvalidRequest(_)
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, String::new(), "gemini-x"),
            LLMError::ModelNotFound(m) if m == "gemini-x"
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, String::new(), "m"),
            LLMError::RateLimitExceeded(_)
        ));
        assert!(matches!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, String::new(), "m"),
            LLMError::RequestFailed(_)
        ));
    }

    #[test]
    fn test_empty_model_rejected() {
        assert!(matches!(
            validate_model(" "),
            Err(LLMError::ConfigurationError(_))
        ));
    }

    #[tokio::test]
    async fn test_decode_stream() {
        let body = concat!(
            "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Pakistan\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\" is\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\" currently...\"}]},",
            "\"finishReason\":\"STOP\"}],\"usageMetadata\":{\"promptTokenCount\":5,\"candidatesTokenCount\":3}}\r\n\r\n",
        );
        // Split at arbitrary byte boundaries
        let pieces: Vec<reqwest::Result<Vec<u8>>> = body
            .as_bytes()
            .chunks(17)
            .map(|c| Ok(c.to_vec()))
            .collect();

        let chunks: Vec<StreamChunk> = decode_stream(
            futures::stream::iter(pieces),
            Arc::new(CallIds::default()),
        )
        .map(|c| c.unwrap())
        .collect()
        .await;

        let text: String = chunks
            .iter()
            .filter_map(|c| match c {
                StreamChunk::TextDelta(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Pakistan is currently...");
        assert_eq!(
            chunks.last(),
            Some(&StreamChunk::Done {
                stop_reason: StopReason::EndTurn,
                usage: Some(TokenUsage {
                    input_tokens: 5,
                    output_tokens: 3
                }),
            })
        );
    }

    #[tokio::test]
    async fn test_decode_stream_malformed_event() {
        let pieces: Vec<reqwest::Result<Vec<u8>>> = vec![Ok(b"data: {not json}\n\n".to_vec())];
        let results: Vec<Result<StreamChunk>> =
            decode_stream(futures::stream::iter(pieces), Arc::new(CallIds::default()))
                .collect()
                .await;
        assert!(matches!(
            results.first(),
            Some(Err(LLMError::UnexpectedResponse(_)))
        ));
    }
}
