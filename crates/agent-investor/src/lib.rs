//! Indian super-investor portfolio assistant
//!
//! Two halves share this crate:
//!
//! - **Directory building** (offline): scrape the top-investor listing,
//!   structure it with a model, look up each investor's portfolio id, cache
//!   the result and write `investors.json`. See [`DirectoryBuilder`].
//! - **Chat** (online): the "Avi" tool-calling agent over the directory, the
//!   portfolio API and web search, served to a browser with streamed replies.
//!   See [`InvestorAgent`] and [`web::create_app`].
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_investor::{InvestorAgent, InvestorConfig, prompts, web};
//! use agent_llm::providers::OpenAIProvider;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = InvestorConfig::from_env()?;
//!     let provider = Arc::new(OpenAIProvider::from_env()?);
//!     let prompts = prompts::default_registry()?;
//!
//!     let agent = InvestorAgent::from_config(&config, provider, &prompts)?;
//!     web::serve("127.0.0.1:8000".parse()?, web::AppState::new(Arc::new(agent))).await?;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod api;
pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod prompts;
pub mod scrape;
pub mod session;
pub mod tools;
pub mod web;

pub use agent::InvestorAgent;
pub use api::{BraveSearchClient, PortfolioClient};
pub use builder::{DirectoryBuilder, load_directory, write_directory};
pub use cache::DirectoryCache;
pub use config::InvestorConfig;
pub use error::{InvestorError, Result};
pub use models::{
    HoldingHistoryEntry, Investor, InvestorCategory, InvestorDirectory, PortfolioHolding,
    SearchResult,
};
pub use session::SessionStore;
pub use tools::AgentDeps;
