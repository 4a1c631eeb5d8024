//! Error types for agent-core

use thiserror::Error;

/// Result type alias for agent-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for agent and tool operations
#[derive(Error, Debug)]
pub enum Error {
    /// Agent construction failed (missing provider, bad prompt, ...)
    #[error("Agent initialization failed: {0}")]
    InitializationFailed(String),

    /// A turn or a tool call failed
    #[error("Agent processing failed: {0}")]
    ProcessingFailed(String),

    /// Tool arguments did not match the tool's schema
    #[error("Invalid tool input: {0}")]
    InvalidInput(String),

    /// The model asked for a tool that is not registered
    #[error("Tool not found: {0}")]
    ToolNotFound(String),
}
