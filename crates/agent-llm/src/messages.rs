//! Message types for LLM communication
//!
//! A conversation is a list of [`Message`]s. Plain turns carry text; the
//! tool-calling loop uses [`ContentBlock::ToolUse`] on assistant messages and
//! [`ContentBlock::ToolResult`] on the replies fed back to the model.

use serde::{Deserialize, Serialize};

/// Key under which a tool call's unparseable argument string is kept
///
/// Providers store `{"_raw_arguments": "<text>"}` as the input when the model
/// sends arguments that are not valid JSON, so the executor can answer the
/// call with a tool error instead of failing the turn.
pub const RAW_ARGUMENTS_KEY: &str = "_raw_arguments";

/// Input recorded for a tool call whose arguments did not parse
pub fn raw_arguments_input(raw: &str) -> serde_json::Value {
    serde_json::json!({ RAW_ARGUMENTS_KEY: raw })
}

/// The raw argument text when `input` is a [`raw_arguments_input`] marker
pub fn malformed_arguments(input: &serde_json::Value) -> Option<&str> {
    let object = input.as_object()?;
    if object.len() != 1 {
        return None;
    }
    object.get(RAW_ARGUMENTS_KEY)?.as_str()
}

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// System message (normally sent via `CompletionRequest::system`)
    System,
}

/// Content block in a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text content
    Text {
        /// Text content
        text: String,
    },

    /// Tool call requested by the assistant
    ToolUse {
        /// Provider-assigned call ID
        id: String,
        /// Tool name
        name: String,
        /// Tool arguments (JSON)
        input: serde_json::Value,
    },

    /// Result of a tool call, sent back to the model
    ToolResult {
        /// ID of the tool call this answers
        tool_use_id: String,
        /// Result content (serialized JSON or text)
        content: String,
        /// Whether the call failed
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

/// Message content: either simple text or structured blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content
    Text(String),
    /// Structured content blocks
    Blocks(Vec<ContentBlock>),
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Message content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
}

impl Message {
    /// Create a user message with text
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(MessageContent::Text(text.into())),
        }
    }

    /// Create an assistant message with text
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(MessageContent::Text(text.into())),
        }
    }

    /// Create a user message carrying a successful tool result
    pub fn tool_result(tool_use_id: String, result: String) -> Self {
        Self::tool_block(tool_use_id, result, None)
    }

    /// Create a user message carrying a failed tool result
    pub fn tool_error(tool_use_id: String, error: String) -> Self {
        Self::tool_block(tool_use_id, error, Some(true))
    }

    fn tool_block(tool_use_id: String, content: String, is_error: Option<bool>) -> Self {
        Self {
            role: Role::User,
            content: Some(MessageContent::Blocks(vec![ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            }])),
        }
    }

    /// All text content of the message, concatenated
    ///
    /// Returns `None` when the message carries no text at all.
    pub fn text(&self) -> Option<String> {
        match &self.content {
            Some(MessageContent::Text(s)) => Some(s.clone()),
            Some(MessageContent::Blocks(blocks)) => {
                let texts: Vec<&str> = blocks
                    .iter()
                    .filter_map(|b| match b {
                        ContentBlock::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect();
                if texts.is_empty() {
                    None
                } else {
                    Some(texts.concat())
                }
            }
            None => None,
        }
    }

    /// Tool calls requested by an assistant message
    pub fn tool_uses(&self) -> Vec<&ContentBlock> {
        match &self.content {
            Some(MessageContent::Blocks(blocks)) => blocks
                .iter()
                .filter(|b| matches!(b, ContentBlock::ToolUse { .. }))
                .collect(),
            _ => vec![],
        }
    }

    /// Check if this message contains any tool calls
    pub fn has_tool_uses(&self) -> bool {
        !self.tool_uses().is_empty()
    }
}
