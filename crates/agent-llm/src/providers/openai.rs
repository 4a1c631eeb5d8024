//! OpenAI and Azure OpenAI chat-completions provider
//!
//! Both services speak the same request/response format and differ only in
//! URL layout and authentication header:
//!
//! | flavor | endpoint | auth |
//! |---|---|---|
//! | OpenAI (and compatible servers) | `{api_base}/chat/completions` | `Authorization: Bearer` |
//! | Azure | `{endpoint}/openai/deployments/{model}/chat/completions?api-version=..` | `api-key` |
//!
//! For Azure the request's `model` is the deployment name.
//!
//! # Example
//!
//! ```no_run
//! use agent_llm::{CompletionRequest, LLMProvider, Message, ResponseFormat};
//! use agent_llm::providers::{OpenAIConfig, OpenAIProvider};
//!
//! # async fn run() -> agent_llm::Result<()> {
//! let config = OpenAIConfig::azure("key", "https://my-resource.openai.azure.com", "2024-08-01-preview");
//! let provider = OpenAIProvider::with_config(config)?;
//!
//! let request = CompletionRequest::builder("gpt-4o")
//!     .add_message(Message::user("Return {\"ok\": true}"))
//!     .response_format(ResponseFormat::JsonObject)
//!     .build();
//!
//! let response = provider.complete(request).await?;
//! println!("{:?}", response.message.text());
//! # Ok(())
//! # }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMError, LLMProvider, Message,
    MessageContent, ResponseFormat, Result, Role, StopReason, TextSink, TokenUsage,
    ToolDefinition, raw_arguments_input,
};
use agent_utils::{env_or, env_var};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_AZURE_API_VERSION: &str = "2024-08-01-preview";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Which URL layout and auth header to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFlavor {
    /// OpenAI or an OpenAI-compatible server
    OpenAI,
    /// Azure OpenAI resource
    Azure {
        /// Value of the `api-version` query parameter
        api_version: String,
    },
}

/// Configuration for the OpenAI provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication
    pub api_key: String,

    /// API base URL (OpenAI) or resource endpoint (Azure)
    pub api_base: String,

    /// URL layout and auth header
    pub flavor: ApiFlavor,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl OpenAIConfig {
    /// OpenAI config with the default base URL
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            flavor: ApiFlavor::OpenAI,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Azure OpenAI config for a resource endpoint
    pub fn azure(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: endpoint.into(),
            flavor: ApiFlavor::Azure {
                api_version: api_version.into(),
            },
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create config from environment variables
    ///
    /// When `AZURE_ENDPOINT` is set the Azure flavor is used with `API_KEY`
    /// and `API_VERSION`. Otherwise the key comes from `OPENAI_API_KEY`
    /// (falling back to `API_KEY`) and the base URL from `OPENAI_API_BASE`.
    pub fn from_env() -> Result<Self> {
        if let Some(endpoint) = env_var("AZURE_ENDPOINT") {
            let api_key = env_var("API_KEY").ok_or_else(|| {
                LLMError::ConfigurationError("API_KEY environment variable not set".to_string())
            })?;
            let api_version = env_or("API_VERSION", DEFAULT_AZURE_API_VERSION);
            return Ok(Self::azure(api_key, endpoint, api_version));
        }

        let api_key = env_var("OPENAI_API_KEY")
            .or_else(|| env_var("API_KEY"))
            .ok_or_else(|| {
                LLMError::ConfigurationError(
                    "neither OPENAI_API_KEY nor API_KEY environment variable is set".to_string(),
                )
            })?;

        Ok(Self::new(api_key).with_api_base(env_or("OPENAI_API_BASE", DEFAULT_OPENAI_API_BASE)))
    }

    /// Set custom API base URL (or Azure endpoint)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Chat-completions URL for `model`
    pub fn chat_url(&self, model: &str) -> String {
        let base = self.api_base.trim_end_matches('/');
        match &self.flavor {
            ApiFlavor::OpenAI => format!("{base}/chat/completions"),
            ApiFlavor::Azure { api_version } => format!(
                "{base}/openai/deployments/{model}/chat/completions?api-version={api_version}"
            ),
        }
    }
}

/// OpenAI / Azure OpenAI provider
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Create a provider with custom configuration
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create an OpenAI provider with an API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenAIConfig::new(api_key))
    }

    /// Create a provider from environment variables (see [`OpenAIConfig::from_env`])
    pub fn from_env() -> Result<Self> {
        Self::with_config(OpenAIConfig::from_env()?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Post a request and map non-2xx statuses to errors
    async fn send(&self, request: CompletionRequest, stream: bool) -> Result<reqwest::Response> {
        let model = request.model.clone();
        let url = self.config.chat_url(&model);
        let body = OpenAIRequest::from_request(request, stream);

        let builder = self.client.post(&url).json(&body);
        let builder = match self.config.flavor {
            ApiFlavor::OpenAI => builder.bearer_auth(&self.config.api_key),
            ApiFlavor::Azure { .. } => builder.header("api-key", &self.config.api_key),
        };

        let timeout_secs = self.config.timeout_secs;
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LLMError::Timeout(timeout_secs)
            } else {
                LLMError::HttpError(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthenticationFailed,
                429 => LLMError::RateLimitExceeded(error_text),
                400 => LLMError::InvalidRequest(error_text),
                404 => LLMError::ModelNotFound(model),
                _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip(self, request), fields(model = %request.model, provider = self.name()))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!("Sending chat completion request");

        let response = self.send(request, false).await?;

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::UnexpectedResponse("No choices in response".to_string()))?;

        debug!(
            finish_reason = ?choice.finish_reason,
            input_tokens = openai_response.usage.prompt_tokens,
            output_tokens = openai_response.usage.completion_tokens,
            "Received chat completion"
        );

        let message = parse_openai_response(choice.message);
        let stop_reason = map_stop_reason(choice.finish_reason.as_deref(), message.has_tool_uses());

        Ok(CompletionResponse {
            message,
            stop_reason,
            usage: openai_response.usage.into(),
        })
    }

    #[instrument(skip(self, request, sink), fields(model = %request.model, provider = self.name()))]
    async fn complete_streaming(
        &self,
        request: CompletionRequest,
        sink: &dyn TextSink,
    ) -> Result<CompletionResponse> {
        debug!("Sending streaming chat completion request");

        let response = self.send(request, true).await?;
        let mut body = response.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut accumulator = StreamAccumulator::default();

        'read: while let Some(bytes) = body.next().await {
            for line in lines.push(&bytes?) {
                if accumulator.apply_line(&line, sink)? {
                    break 'read;
                }
            }
        }
        if let Some(line) = lines.remainder() {
            accumulator.apply_line(&line, sink)?;
        }

        Ok(accumulator.finish())
    }

    fn name(&self) -> &str {
        match self.config.flavor {
            ApiFlavor::OpenAI => "openai",
            ApiFlavor::Azure { .. } => "azure",
        }
    }
}

// ============================================================================
// Wire types: request
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

impl OpenAIRequest {
    fn from_request(request: CompletionRequest, stream: bool) -> Self {
        Self {
            messages: build_openai_messages(request.system, request.messages),
            tools: request.tools.as_deref().map(convert_tools),
            model: request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: request.response_format,
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

// ============================================================================
// Wire types: response
// ============================================================================

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: OpenAIUsage,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseToolCall {
    id: String,
    function: OpenAIResponseFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

impl From<OpenAIUsage> for TokenUsage {
    fn from(usage: OpenAIUsage) -> Self {
        Self {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        }
    }
}

// ============================================================================
// Wire types: streaming chunks
// ============================================================================

#[derive(Debug, Deserialize)]
struct OpenAIStreamChunk {
    // Azure sends a leading chunk with no choices (prompt filter results)
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChoice {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    delta: OpenAIDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIDelta {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIDeltaToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIDeltaToolCall {
    index: usize,
    id: Option<String>,
    function: Option<OpenAIDeltaFunction>,
}

#[derive(Debug, Deserialize)]
struct OpenAIDeltaFunction {
    name: Option<String>,
    arguments: Option<String>,
}

/// Splits a byte stream into lines, holding back a trailing partial line
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(
                String::from_utf8_lossy(&line)
                    .trim_end_matches(['\r', '\n'])
                    .to_string(),
            );
        }
        lines
    }

    fn remainder(self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.pending).trim().to_string();
        (!rest.is_empty()).then_some(rest)
    }
}

/// Rebuilds a full completion from streamed deltas
#[derive(Debug, Default)]
struct StreamAccumulator {
    text: String,
    tool_calls: Vec<PartialToolCall>,
    finish_reason: Option<String>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

impl StreamAccumulator {
    /// Apply one SSE line; returns `true` once the `[DONE]` marker is seen
    fn apply_line(&mut self, line: &str, sink: &dyn TextSink) -> Result<bool> {
        let Some(data) = line.strip_prefix("data:").map(str::trim) else {
            return Ok(false);
        };
        if data == "[DONE]" {
            return Ok(true);
        }
        if data.is_empty() {
            return Ok(false);
        }

        let chunk: OpenAIStreamChunk = serde_json::from_str(data).map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse stream chunk: {e}"))
        })?;
        if let Some(delta) = self.push(chunk) {
            sink.on_text(&delta);
        }
        Ok(false)
    }

    /// Merge a chunk; returns any new assistant text
    fn push(&mut self, chunk: OpenAIStreamChunk) -> Option<String> {
        if let Some(usage) = chunk.usage {
            self.usage = Some(usage);
        }

        let mut emitted = String::new();
        for choice in chunk.choices.into_iter().filter(|c| c.index == 0) {
            if let Some(content) = choice.delta.content {
                self.text.push_str(&content);
                emitted.push_str(&content);
            }
            for call in choice.delta.tool_calls.unwrap_or_default() {
                if self.tool_calls.len() <= call.index {
                    self.tool_calls
                        .resize_with(call.index + 1, PartialToolCall::default);
                }
                let slot = &mut self.tool_calls[call.index];
                if let Some(id) = call.id {
                    slot.id = id;
                }
                if let Some(function) = call.function {
                    if let Some(name) = function.name {
                        slot.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        slot.arguments.push_str(&arguments);
                    }
                }
            }
            if choice.finish_reason.is_some() {
                self.finish_reason = choice.finish_reason;
            }
        }

        (!emitted.is_empty()).then_some(emitted)
    }

    fn finish(self) -> CompletionResponse {
        let tool_calls: Vec<OpenAIResponseToolCall> = self
            .tool_calls
            .into_iter()
            .filter(|call| !call.name.is_empty())
            .map(|call| OpenAIResponseToolCall {
                id: call.id,
                function: OpenAIResponseFunctionCall {
                    name: call.name,
                    arguments: call.arguments,
                },
            })
            .collect();

        let message = parse_openai_response(OpenAIResponseMessage {
            content: Some(self.text),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        });
        let stop_reason = map_stop_reason(self.finish_reason.as_deref(), message.has_tool_uses());

        CompletionResponse {
            message,
            stop_reason,
            usage: self.usage.unwrap_or_default().into(),
        }
    }
}

// ============================================================================
// Conversion functions
// ============================================================================

/// Build OpenAI messages; the system prompt goes first in the array
fn build_openai_messages(system: Option<String>, messages: Vec<Message>) -> Vec<OpenAIMessage> {
    let mut result = Vec::with_capacity(messages.len() + 1);

    if let Some(sys) = system {
        result.push(OpenAIMessage {
            role: "system",
            content: Some(sys),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    for msg in messages {
        result.extend(convert_message(msg));
    }

    result
}

/// Convert a single message; tool results become separate `tool` messages
fn convert_message(msg: Message) -> Vec<OpenAIMessage> {
    let role = match msg.role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    };

    let blocks = match msg.content {
        Some(MessageContent::Blocks(blocks)) => blocks,
        Some(MessageContent::Text(text)) => vec![ContentBlock::Text { text }],
        None => vec![ContentBlock::Text {
            text: String::new(),
        }],
    };

    let mut text: Option<String> = None;
    let mut tool_calls = Vec::new();
    let mut tool_messages = Vec::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text: t } => text.get_or_insert_with(String::new).push_str(&t),
            ContentBlock::ToolUse { id, name, input } => tool_calls.push(OpenAIToolCall {
                id,
                tool_type: "function",
                function: OpenAIFunctionCall {
                    name,
                    arguments: input.to_string(),
                },
            }),
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } => tool_messages.push(OpenAIMessage {
                role: "tool",
                content: Some(content),
                tool_calls: None,
                tool_call_id: Some(tool_use_id),
            }),
        }
    }

    let mut messages = Vec::with_capacity(tool_messages.len() + 1);
    if text.is_some() || !tool_calls.is_empty() {
        messages.push(OpenAIMessage {
            role,
            content: text,
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            tool_call_id: None,
        });
    }
    messages.extend(tool_messages);
    messages
}

/// Convert tool definitions to OpenAI function tools
fn convert_tools(tools: &[ToolDefinition]) -> Vec<OpenAITool> {
    tools
        .iter()
        .map(|tool| OpenAITool {
            tool_type: "function",
            function: OpenAIFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        })
        .collect()
}

/// Parse an OpenAI response message into our format
fn parse_openai_response(msg: OpenAIResponseMessage) -> Message {
    let mut blocks = Vec::new();

    if let Some(content) = msg.content.filter(|c| !c.is_empty()) {
        blocks.push(ContentBlock::Text { text: content });
    }

    for call in msg.tool_calls.unwrap_or_default() {
        let arguments = call.function.arguments.trim();
        let input: serde_json::Value = if arguments.is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(arguments).unwrap_or_else(|e| {
                warn!(
                    tool_name = %call.function.name,
                    error = %e,
                    "Tool call arguments are not valid JSON"
                );
                raw_arguments_input(arguments)
            })
        };

        blocks.push(ContentBlock::ToolUse {
            id: call.id,
            name: call.function.name,
            input,
        });
    }

    if blocks.is_empty() {
        blocks.push(ContentBlock::Text {
            text: String::new(),
        });
    }

    Message {
        role: Role::Assistant,
        content: Some(MessageContent::Blocks(blocks)),
    }
}

/// Map an OpenAI finish reason; tool calls win over a plain "stop"
fn map_stop_reason(reason: Option<&str>, has_tool_calls: bool) -> StopReason {
    match reason {
        Some("length") => StopReason::MaxTokens,
        _ if has_tool_calls => StopReason::ToolUse,
        Some("stop") | None => StopReason::EndTurn,
        Some("content_filter") => {
            warn!("Completion cut short by the content filter");
            StopReason::EndTurn
        }
        Some(other) => {
            debug!(reason = other, "Unknown finish reason");
            StopReason::EndTurn
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
