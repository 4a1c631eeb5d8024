//! Agent trait definition

use crate::{Context, Result};
use async_trait::async_trait;

/// A conversational agent that turns one user message into one reply
///
/// Anything that must survive between turns (chat history, the session id)
/// lives in the [`Context`] owned by the caller, so one agent instance can
/// serve many independent conversations.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Answer `input`, reading and updating the conversation state in `context`
    async fn process(&self, input: String, context: &mut Context) -> Result<String>;

    /// Get the agent's name
    fn name(&self) -> &str;
}
