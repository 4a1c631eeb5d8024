//! Concrete LLM provider implementations

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "openai")]
pub use openai::{ApiFlavor, OpenAIConfig, OpenAIProvider};
