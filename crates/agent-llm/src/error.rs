//! Errors raised while talking to the chat-completions endpoint

use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// LLM provider errors
///
/// Non-2xx statuses are mapped by code: 401/403 to
/// [`AuthenticationFailed`](Self::AuthenticationFailed), 429 to
/// [`RateLimitExceeded`](Self::RateLimitExceeded), 400 to
/// [`InvalidRequest`](Self::InvalidRequest), 404 to
/// [`ModelNotFound`](Self::ModelNotFound), anything else to
/// [`RequestFailed`](Self::RequestFailed).
#[derive(Error, Debug)]
pub enum LLMError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// The key was rejected (check `API_KEY`)
    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The endpoint rejected the request body
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unknown model, or no such Azure deployment
    #[error("Model or deployment not found: {0}")]
    ModelNotFound(String),

    /// No reply within the configured timeout
    #[error("No response from the model within {0} seconds")]
    Timeout(u64),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Connection or transport failure
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The reply (or a stream chunk) did not have the expected shape
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Missing or invalid provider settings
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}
