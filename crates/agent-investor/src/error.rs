//! Error types for the investor assistant

use thiserror::Error;

/// Investor assistant errors
#[derive(Debug, Error)]
pub enum InvestorError {
    /// Outbound request failed (network error or non-2xx status)
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The investor listing page could not be retrieved or converted
    #[error("Failed to scrape investor listing: {0}")]
    Scrape(String),

    /// A profile page fetch failed while looking up portfolio ids
    #[error("Failed to enrich investor '{investor}': {reason}")]
    Enrichment { investor: String, reason: String },

    /// The model reply did not match the directory shape
    #[error("Failed to extract investor directory: {0}")]
    Extraction(String),

    /// A payload was missing expected fields
    #[error("Unexpected payload: {0}")]
    Parse(String),

    /// Cache read/write failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite error from the directory cache
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Model call failed
    #[error("LLM error: {0}")]
    Llm(#[from] agent_llm::LLMError),

    /// Prompt template failed to render
    #[error("Prompt error: {0}")]
    Prompt(#[from] agent_prompt::PromptError),

    /// HTTP client construction or transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error raised by the agent runtime
    #[error("{0}")]
    Agent(String),
}

/// Result type alias for investor operations
pub type Result<T> = std::result::Result<T, InvestorError>;

impl From<InvestorError> for agent_core::Error {
    fn from(err: InvestorError) -> Self {
        match err {
            InvestorError::Config(msg) => agent_core::Error::InitializationFailed(msg),
            other => agent_core::Error::ProcessingFailed(other.to_string()),
        }
    }
}

impl From<agent_core::Error> for InvestorError {
    fn from(err: agent_core::Error) -> Self {
        InvestorError::Agent(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InvestorError::Enrichment {
            investor: "Jane Doe".to_string(),
            reason: "HTTP 503".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to enrich investor 'Jane Doe': HTTP 503");

        let err = InvestorError::Fetch {
            url: "https://example.com".to_string(),
            reason: "timed out".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to fetch https://example.com: timed out");
    }

    #[test]
    fn test_error_conversion() {
        let agent_err: agent_core::Error = InvestorError::Config("no key".to_string()).into();
        assert!(matches!(agent_err, agent_core::Error::InitializationFailed(msg) if msg == "no key"));

        let agent_err: agent_core::Error = InvestorError::Scrape("HTTP 500".to_string()).into();
        match agent_err {
            agent_core::Error::ProcessingFailed(msg) => assert!(msg.contains("HTTP 500")),
            other => panic!("Expected ProcessingFailed, got {other:?}"),
        }
    }
}
