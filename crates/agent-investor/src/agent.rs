//! The "Avi" investor assistant agent

use crate::api::{BraveSearchClient, PortfolioClient};
use crate::builder::load_directory;
use crate::config::InvestorConfig;
use crate::error::{InvestorError, Result};
use crate::models::InvestorCategory;
use crate::prompts::ASSISTANT_SYSTEM;
use crate::tools::{AgentDeps, register_tools};
use agent_core::{Agent, Context};
use agent_llm::LLMProvider;
use agent_prompt::PromptRegistry;
use agent_runtime::{AgentExecutor, ExecutorEventHandler, ToolAgent};
use agent_tools::ToolRegistry;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Tool-calling chat agent over the investor directory and portfolio APIs
///
/// One agent serves every session; per-session history lives in the
/// [`Context`] passed to [`chat`](Self::chat).
pub struct InvestorAgent {
    inner: ToolAgent,
    tool_names: Vec<String>,
}

impl InvestorAgent {
    /// Create an agent whose prompt and tools carry today's local date
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        deps: AgentDeps,
        config: &InvestorConfig,
        prompts: &PromptRegistry,
    ) -> Result<Self> {
        Self::with_date(provider, deps, config, prompts, Local::now().date_naive())
    }

    /// Create an agent as of `today`
    pub fn with_date(
        provider: Arc<dyn LLMProvider>,
        deps: AgentDeps,
        config: &InvestorConfig,
        prompts: &PromptRegistry,
        today: NaiveDate,
    ) -> Result<Self> {
        let other_categories = InvestorCategory::ALL
            .iter()
            .filter(|c| **c != InvestorCategory::default())
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let system_prompt = prompts.render(
            ASSISTANT_SYSTEM,
            &json!({
                "current_date": today.format("%Y-%m-%d").to_string(),
                "other_categories": other_categories,
            }),
        )?;

        let registry = Arc::new(ToolRegistry::new());
        register_tools(&registry, &deps, today);
        let tool_names = registry
            .list_tools()
            .iter()
            .map(|t| t.name().to_string())
            .collect();

        let executor = AgentExecutor::builder()
            .provider(provider)
            .tool_registry(registry)
            .model(&config.model)
            .system_prompt(system_prompt)
            .temperature(config.chat_temperature)
            .build()?;

        info!(
            model = %config.model,
            investors = deps.directory.len(),
            %today,
            "Investor agent ready"
        );

        Ok(Self {
            inner: ToolAgent::new(executor, "avi"),
            tool_names,
        })
    }

    /// Load the directory file and build the API clients from `config`
    pub fn from_config(
        config: &InvestorConfig,
        provider: Arc<dyn LLMProvider>,
        prompts: &PromptRegistry,
    ) -> Result<Self> {
        let directory = load_directory(&config.investors_file).map_err(|e| {
            InvestorError::Config(format!(
                "Cannot load investor directory from {} ({e}); run `investor-agent build-directory` first",
                config.investors_file.display()
            ))
        })?;

        let deps = AgentDeps {
            portfolio: Arc::new(PortfolioClient::new(config)?),
            search: Arc::new(BraveSearchClient::new(config)?),
            directory: Arc::new(directory),
        };
        Self::new(provider, deps, config, prompts)
    }

    /// Run one user turn, streaming progress to `handler` when given
    pub async fn chat(
        &self,
        input: String,
        context: &mut Context,
        handler: Option<Arc<dyn ExecutorEventHandler>>,
    ) -> Result<String> {
        Ok(self.inner.process_with_handler(input, context, handler).await?)
    }

    /// Names of the registered tools, sorted
    pub fn tool_names(&self) -> &[String] {
        &self.tool_names
    }

    /// The rendered system prompt
    pub fn system_prompt(&self) -> Option<&str> {
        self.inner.executor().config().system_prompt.as_deref()
    }
}

#[async_trait]
impl Agent for InvestorAgent {
    async fn process(&self, input: String, context: &mut Context) -> agent_core::Result<String> {
        self.inner.process(input, context).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
