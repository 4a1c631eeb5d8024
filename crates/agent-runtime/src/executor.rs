//! Agent executor for running agent loops
//!
//! The AgentExecutor implements the tool-calling loop:
//! 1. Call the model with the conversation and the registry's tools
//! 2. If it asks for tools, dispatch each call in order and feed results back
//! 3. Repeat until the model ends its turn
//!
//! Tool failures never abort the loop. Unknown tool names, bad arguments and
//! tool errors are sent back to the model as `{"error": "..."}` results.

use agent_core::{Error, Result};
use agent_llm::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMProvider, Message, StopReason,
    ToolDefinition, malformed_arguments,
};
use agent_tools::ToolRegistry;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const MAX_ITERATIONS_REPLY: &str = "Max iterations reached without completion";
const TRUNCATED_REPLY: &str = "Response truncated due to token limit";

/// Event handler for agent execution events
///
/// Implement this trait to stream progress to a client. When a handler is
/// attached the executor requests streamed completions and forwards text
/// through [`on_text_delta`](Self::on_text_delta).
#[async_trait]
pub trait ExecutorEventHandler: Send + Sync {
    /// Called with each piece of assistant text as it is generated
    fn on_text_delta(&self, _delta: &str) {}

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

    /// Called when the agent completes
    async fn on_complete(&self, _result: &str) {}

    /// Called when an error occurs
    async fn on_error(&self, _error: &str) {}
}

/// Configuration for agent execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of model calls per turn
    pub max_iterations: usize,

    /// Model (or Azure deployment) to use
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
            model: "gpt-4o".to_string(),
            system_prompt: None,
            max_tokens: 4096,
            temperature: Some(0.3),
        }
    }
}

/// Executes an agent loop: model → tool calls → dispatch → loop back
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

    /// Create a builder
    pub fn builder() -> AgentExecutorBuilder {
        AgentExecutorBuilder::new()
    }

    /// Executor configuration
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Tool registry the executor dispatches to
    pub fn tool_registry(&self) -> &Arc<ToolRegistry> {
        &self.tool_registry
    }

    /// Answer a single message with no prior history
    pub async fn run(&self, user_message: String) -> Result<String> {
        self.run_with_history(user_message, Vec::new()).await
    }

    /// Answer a message given the previous conversation
    pub async fn run_with_history(
        &self,
        user_message: String,
        history: Vec<Message>,
    ) -> Result<String> {
        let mut conversation = history;
        conversation.push(Message::user(user_message));
        self.run_turn(&mut conversation, None).await
    }

    /// Answer a message with a per-request event handler
    pub async fn run_with_history_and_handler(
        &self,
        user_message: String,
        history: Vec<Message>,
        handler: Arc<dyn ExecutorEventHandler>,
    ) -> Result<String> {
        let mut conversation = history;
        conversation.push(Message::user(user_message));
        self.run_turn(&mut conversation, Some(handler)).await
    }

    /// Run the loop on `conversation`, whose last message is the user's
    ///
    /// Assistant messages and tool results produced during the turn are
    /// appended, so the caller can keep the vector as the session history.
    pub async fn run_turn(
        &self,
        conversation: &mut Vec<Message>,
        event_handler: Option<Arc<dyn ExecutorEventHandler>>,
    ) -> Result<String> {
        let outcome = self.drive(conversation, event_handler.as_ref()).await;

        if let (Err(e), Some(handler)) = (&outcome, &event_handler) {
            handler.on_error(&e.to_string()).await;
        }
        outcome
    }

    async fn drive(
        &self,
        conversation: &mut Vec<Message>,
        event_handler: Option<&Arc<dyn ExecutorEventHandler>>,
    ) -> Result<String> {
        let tools = self.build_tool_definitions();
        debug!(tool_count = tools.len(), "Available tools");

        for iteration in 1..=self.config.max_iterations {
            info!(
                iteration,
                max_iterations = self.config.max_iterations,
                "Agent iteration started"
            );

            let response = self
                .call_model(conversation.clone(), &tools, event_handler)
                .await?;

            info!(
                stop_reason = ?response.stop_reason,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "LLM response received"
            );

            let message = response.message;
            conversation.push(message.clone());

            match response.stop_reason {
                StopReason::ToolUse if message.has_tool_uses() => {
                    let results = self.execute_tools(&message, event_handler).await;
                    debug!(
                        result_count = results.len(),
                        "Tool execution completed, continuing agent loop"
                    );
                    conversation.extend(results);
                }
                StopReason::MaxTokens => {
                    warn!("Hit max tokens in LLM response");
                    let text = message
                        .text()
                        .filter(|t| !t.is_empty())
                        .unwrap_or_else(|| TRUNCATED_REPLY.to_string());
                    return self.finish(text, event_handler).await;
                }
                _ => {
                    let text = message.text().unwrap_or_default();
                    info!(
                        iteration,
                        response_length = text.len(),
                        "Agent completed naturally"
                    );
                    return self.finish(text, event_handler).await;
                }
            }
        }

        warn!(
            max_iterations = self.config.max_iterations,
            "Max iterations reached, stopping"
        );
        self.finish(MAX_ITERATIONS_REPLY.to_string(), event_handler)
            .await
    }

    async fn finish(
        &self,
        text: String,
        event_handler: Option<&Arc<dyn ExecutorEventHandler>>,
    ) -> Result<String> {
        if let Some(handler) = event_handler {
            handler.on_complete(&text).await;
        }
        Ok(text)
    }

    /// One model call; streamed when a handler is listening
    async fn call_model(
        &self,
        messages: Vec<Message>,
        tools: &[ToolDefinition],
        event_handler: Option<&Arc<dyn ExecutorEventHandler>>,
    ) -> Result<CompletionResponse> {
        let mut builder = CompletionRequest::builder(&self.config.model)
            .messages(messages)
            .max_tokens(self.config.max_tokens);
        if let Some(system) = &self.config.system_prompt {
            builder = builder.system(system.clone());
        }
        if let Some(temperature) = self.config.temperature {
            builder = builder.temperature(temperature);
        }
        if !tools.is_empty() {
            builder = builder.tools(tools.to_vec());
        }
        let request = builder.build();

        debug!(
            model = %self.config.model,
            provider = self.provider.name(),
            streaming = event_handler.is_some(),
            "Sending request to LLM"
        );

        let response = match event_handler {
            Some(handler) => {
                let sink = |delta: &str| handler.on_text_delta(delta);
                self.provider.complete_streaming(request, &sink).await
            }
            None => self.provider.complete(request).await,
        };

        response.map_err(|e| Error::ProcessingFailed(e.to_string()))
    }

    /// Build tool definitions from the registry
    fn build_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tool_registry
            .list_tools()
            .iter()
            .map(|tool| ToolDefinition::new(tool.name(), tool.description(), tool.input_schema()))
            .collect()
    }

    /// Dispatch every tool call of an assistant message, in order
    async fn execute_tools(
        &self,
        message: &Message,
        event_handler: Option<&Arc<dyn ExecutorEventHandler>>,
    ) -> Vec<Message> {
        let mut results = Vec::new();

        for tool_use in message.tool_uses() {
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

            if let Some(handler) = event_handler {
                handler.on_tool_start(id, name, input).await;
            }

            let start_time = Instant::now();
            let outcome = match malformed_arguments(input) {
                Some(raw) => Err(Error::InvalidInput(format!(
                    "Arguments for '{name}' are not valid JSON: {raw}"
                ))),
                None => self.tool_registry.dispatch(name, input.clone()).await,
            };
            let duration_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);

            match outcome {
                Ok(result) => {
                    let result_str = result.to_string();
                    info!(
                        tool_name = %name,
                        duration_ms,
                        result_length = result_str.len(),
                        "Tool execution succeeded"
                    );

                    if let Some(handler) = event_handler {
                        handler
                            .on_tool_done(id, name, Ok(&result), duration_ms)
                            .await;
                    }

                    results.push(Message::tool_result(id.clone(), result_str));
                }
                Err(e) => {
                    let error_str = e.to_string();
                    warn!(
                        tool_name = %name,
                        duration_ms,
                        error = %e,
                        "Tool execution failed"
                    );

                    if let Some(handler) = event_handler {
                        handler
                            .on_tool_done(id, name, Err(&error_str), duration_ms)
                            .await;
                    }

                    results.push(Message::tool_error(
                        id.clone(),
                        json!({ "error": error_str }).to_string(),
                    ));
                }
            }
        }

        results
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

        Ok(AgentExecutor {
            provider,
            tool_registry: self.tool_registry,
            config: self.config,
        })
    }
}

impl Default for AgentExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use agent_llm::{MessageContent, Role, TokenUsage};
    use agent_tools::Tool;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Provider that replays a fixed script of responses and records requests
    pub(crate) struct ScriptedProvider {
        script: Mutex<VecDeque<CompletionResponse>>,
        pub(crate) requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        pub(crate) fn new(script: Vec<CompletionResponse>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> agent_llm::Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request);
            self.script.lock().unwrap().pop_front().ok_or_else(|| {
                agent_llm::LLMError::UnexpectedResponse("script exhausted".to_string())
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    pub(crate) fn text_reply(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    pub(crate) fn tool_call(id: &str, name: &str, input: Value) -> CompletionResponse {
        CompletionResponse {
            message: Message {
                role: Role::Assistant,
                content: Some(MessageContent::Blocks(vec![ContentBlock::ToolUse {
                    id: id.to_string(),
                    name: name.to_string(),
                    input,
                }])),
            },
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        }
    }

    struct CategoryTool;

    #[async_trait]
    impl Tool for CategoryTool {
        async fn execute(&self, params: Value) -> Result<Value> {
            let category = params["category"]
                .as_str()
                .ok_or_else(|| Error::InvalidInput("category is required".to_string()))?;
            Ok(json!([{"name": format!("top of {category}")}]))
        }

        fn name(&self) -> &str {
            "get_top_indian_investor_list"
        }

        fn description(&self) -> &str {
            "List investors"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {"category": {"type": "string"}}})
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ExecutorEventHandler for Recorder {
        fn on_text_delta(&self, delta: &str) {
            self.events.lock().unwrap().push(format!("delta:{delta}"));
        }

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

        async fn on_complete(&self, result: &str) {
            self.events.lock().unwrap().push(format!("complete:{result}"));
        }

        async fn on_error(&self, error: &str) {
            self.events.lock().unwrap().push(format!("error:{error}"));
        }
    }

    fn executor(provider: Arc<ScriptedProvider>) -> AgentExecutor {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(CategoryTool));
        AgentExecutor::builder()
            .provider(provider)
            .tool_registry(registry)
            .system_prompt("You are Avi")
            .build()
            .unwrap()
    }

    fn tool_result_content(message: &Message) -> (String, Option<bool>) {
        match &message.content {
            Some(MessageContent::Blocks(blocks)) => match &blocks[0] {
                ContentBlock::ToolResult {
                    content, is_error, ..
                } => (content.clone(), *is_error),
                other => panic!("unexpected block {other:?}"),
            },
            other => panic!("unexpected content {other:?}"),
        }
    }

    #[test]
    fn test_builder() {
        let builder = AgentExecutorBuilder::new()
            .model("gpt-4o-mini")
            .max_iterations(5)
            .temperature(0.3)
            .system_prompt("Test prompt");

        assert_eq!(builder.config.model, "gpt-4o-mini");
        assert_eq!(builder.config.max_iterations, 5);
        assert_eq!(builder.config.system_prompt, Some("Test prompt".to_string()));
        assert!(matches!(builder.build(), Err(Error::InitializationFailed(_))));
    }

    #[test]
    fn test_default_config() {
        let config = ExecutorConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_tool_loop_feeds_results_back() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call(
                "call_1",
                "get_top_indian_investor_list",
                json!({"category": "fii_investors"}),
            ),
            text_reply("Here are the FII investors."),
        ]));
        let executor = executor(provider.clone());

        let mut conversation = vec![Message::user("Top FIIs?")];
        let reply = executor.run_turn(&mut conversation, None).await.unwrap();

        assert_eq!(reply, "Here are the FII investors.");
        // user, assistant tool call, tool result, final assistant
        assert_eq!(conversation.len(), 4);
        let (content, is_error) = tool_result_content(&conversation[2]);
        assert!(content.contains("top of fii_investors"));
        assert_eq!(is_error, None);

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].system.as_deref(), Some("You are Avi"));
        assert_eq!(requests[0].tools.as_ref().map(Vec::len), Some(1));
        assert_eq!(requests[1].messages.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_arguments_become_tool_errors() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call("call_1", "delete_everything", json!({})),
            tool_call("call_2", "get_top_indian_investor_list", json!({"category": 7})),
            text_reply("Sorry, I could not do that."),
        ]));
        let executor = executor(provider);

        let mut conversation = vec![Message::user("hi")];
        let reply = executor.run_turn(&mut conversation, None).await.unwrap();
        assert_eq!(reply, "Sorry, I could not do that.");

        let (unknown, flag) = tool_result_content(&conversation[2]);
        assert_eq!(flag, Some(true));
        let unknown: Value = serde_json::from_str(&unknown).unwrap();
        assert!(unknown["error"].as_str().unwrap().contains("delete_everything"));

        let (bad_args, flag) = tool_result_content(&conversation[4]);
        assert_eq!(flag, Some(true));
        assert!(bad_args.contains("category is required"));
    }

    #[tokio::test]
    async fn test_unparseable_arguments_are_answered_without_dispatch() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call(
                "call_1",
                "get_top_indian_investor_list",
                agent_llm::raw_arguments_input(r#"{"category": "fii"#),
            ),
            tool_call(
                "call_2",
                "get_top_indian_investor_list",
                json!({"category": "fii_investors"}),
            ),
            text_reply("Here are the FII investors."),
        ]));
        let recorder = Arc::new(Recorder::default());
        let executor = executor(provider.clone());

        let mut conversation = vec![Message::user("Top FIIs?")];
        let reply = executor
            .run_turn(&mut conversation, Some(recorder.clone()))
            .await
            .unwrap();
        assert_eq!(reply, "Here are the FII investors.");

        let (content, flag) = tool_result_content(&conversation[2]);
        assert_eq!(flag, Some(true));
        let content: Value = serde_json::from_str(&content).unwrap();
        assert!(content["error"].as_str().unwrap().contains("not valid JSON"));

        let (retried, flag) = tool_result_content(&conversation[4]);
        assert_eq!(flag, None);
        assert!(retried.contains("top of fii_investors"));

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(events[1], "done:get_top_indian_investor_list:err");
        assert_eq!(provider.requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_handler_receives_stream_and_tool_events() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call(
                "call_1",
                "get_top_indian_investor_list",
                json!({"category": "individual_investors"}),
            ),
            text_reply("Done."),
        ]));
        let recorder = Arc::new(Recorder::default());
        let executor = executor(provider);

        let reply = executor
            .run_with_history_and_handler("list".to_string(), Vec::new(), recorder.clone())
            .await
            .unwrap();
        assert_eq!(reply, "Done.");

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "start:get_top_indian_investor_list",
                "done:get_top_indian_investor_list:ok",
                "delta:Done.",
                "complete:Done.",
            ]
        );
    }

    #[tokio::test]
    async fn test_provider_failure_reports_error() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let recorder = Arc::new(Recorder::default());
        let executor = executor(provider);

        let err = executor
            .run_with_history_and_handler("hi".to_string(), Vec::new(), recorder.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProcessingFailed(_)));

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].starts_with("error:"));
    }

    #[tokio::test]
    async fn test_max_iterations_stops_the_loop() {
        let script = (0..3)
            .map(|i| {
                tool_call(
                    &format!("call_{i}"),
                    "get_top_indian_investor_list",
                    json!({"category": "fii_investors"}),
                )
            })
            .collect();
        let provider = Arc::new(ScriptedProvider::new(script));
        let executor = AgentExecutor::builder()
            .provider(provider)
            .max_iterations(2)
            .build()
            .unwrap();

        let reply = executor.run("loop".to_string()).await.unwrap();
        assert_eq!(reply, MAX_ITERATIONS_REPLY);
    }
}
