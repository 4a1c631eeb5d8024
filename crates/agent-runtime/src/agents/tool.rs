//! Tool agent implementation (wraps AgentExecutor)

use crate::executor::{AgentExecutor, ExecutorEventHandler};
use agent_core::context::keys;
use agent_core::{Agent, Context, Result};
use agent_llm::Message;
use async_trait::async_trait;
use std::sync::Arc;

/// An agent that runs the tool-calling loop and remembers the conversation
///
/// The message history lives in the caller's [`Context`] under
/// [`keys::HISTORY`] and is replayed to the model on every turn, so one
/// `ToolAgent` can serve many sessions.
///
/// # Example
///
/// ```no_run
/// use agent_core::{Agent, Context};
/// use agent_runtime::{AgentExecutor, ToolAgent};
/// # use std::sync::Arc;
///
/// # async fn example(provider: Arc<dyn agent_llm::LLMProvider>) -> agent_core::Result<()> {
/// let executor = AgentExecutor::builder().provider(provider).build()?;
/// let agent = ToolAgent::new(executor, "avi");
///
/// let mut context = Context::new().with_session_id("s-1");
/// let reply = agent.process("Who are the top FII investors?".to_string(), &mut context).await?;
/// # Ok(())
/// # }
/// ```
pub struct ToolAgent {
    executor: AgentExecutor,
    name: String,
}

impl ToolAgent {
    /// Create a new tool agent
    pub fn new(executor: AgentExecutor, name: impl Into<String>) -> Self {
        Self {
            executor,
            name: name.into(),
        }
    }

    /// Get a reference to the underlying executor
    pub fn executor(&self) -> &AgentExecutor {
        &self.executor
    }

    /// Message history stored in `context`
    pub fn history(context: &Context) -> Result<Vec<Message>> {
        Ok(context
            .get_typed::<Vec<Message>>(keys::HISTORY)?
            .unwrap_or_default())
    }

    /// Like [`Agent::process`], reporting progress to `handler`
    ///
    /// History is only written back when the turn succeeds, so a failed
    /// model call leaves the session as it was.
    pub async fn process_with_handler(
        &self,
        input: String,
        context: &mut Context,
        handler: Option<Arc<dyn ExecutorEventHandler>>,
    ) -> Result<String> {
        let mut conversation = Self::history(context)?;
        conversation.push(Message::user(input));

        let reply = self.executor.run_turn(&mut conversation, handler).await?;
        context.insert_typed(keys::HISTORY, &conversation)?;
        Ok(reply)
    }
}

#[async_trait]
impl Agent for ToolAgent {
    async fn process(&self, input: String, context: &mut Context) -> Result<String> {
        self.process_with_handler(input, context, None).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
