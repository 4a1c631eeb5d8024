//! LLM provider abstraction layer
//!
//! Provider-agnostic types for talking to chat-completion models:
//!
//! - Message types, including tool calls and tool results
//! - Completion request/response types, with JSON-object response format
//! - Tool definitions for function calling
//! - The [`LLMProvider`] trait, with incremental text streaming
//! - An OpenAI / Azure OpenAI provider (behind the `openai` feature)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod tools;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, ResponseFormat, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{
    ContentBlock, Message, MessageContent, RAW_ARGUMENTS_KEY, Role, malformed_arguments,
    raw_arguments_input,
};
pub use provider::{LLMProvider, TextSink};
pub use tools::ToolDefinition;

// Provider implementations (feature-gated)
#[cfg(feature = "openai")]
pub mod providers;
