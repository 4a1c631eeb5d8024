//! `investor-agent`: build the investor directory, chat in the terminal, or serve the chat UI

use agent_core::Context;
use agent_investor::prompts::default_registry;
use agent_investor::scrape::HttpPageFetcher;
use agent_investor::web::{self, AppState};
use agent_investor::{DirectoryBuilder, DirectoryCache, InvestorAgent, InvestorConfig};
use agent_llm::LLMProvider;
use agent_llm::providers::OpenAIProvider;
use agent_runtime::ExecutorEventHandler;
use anyhow::Context as _;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "investor-agent")]
#[command(about = "Chat about Indian super-investor portfolios", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape and structure the top-investor directory into investors.json
    BuildDirectory {
        /// Ignore the cached directory and rebuild
        #[arg(long)]
        refresh: bool,

        /// Write here instead of INVESTORS_FILE
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Chat with the assistant in the terminal
    Chat,
    /// Serve the browser chat UI
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    agent_utils::load_dotenv();
    agent_utils::init_tracing("info");

    let cli = Cli::parse();
    let config = InvestorConfig::from_env()?;
    let provider: Arc<dyn LLMProvider> =
        Arc::new(OpenAIProvider::from_env().context("LLM provider configuration")?);
    info!(provider = provider.name(), model = %config.model, "Starting investor-agent");

    match cli.command {
        Commands::BuildDirectory { refresh, output } => {
            build_directory(&config, provider, refresh, output).await
        }
        Commands::Chat => chat(&config, provider).await,
        Commands::Serve { addr } => {
            let agent = load_agent(&config, provider)?;
            web::serve(addr, AppState::new(Arc::new(agent))).await?;
            Ok(())
        }
    }
}

async fn build_directory(
    config: &InvestorConfig,
    provider: Arc<dyn LLMProvider>,
    refresh: bool,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let cache = Arc::new(DirectoryCache::open(config.cache_path())?);
    let fetcher = Arc::new(HttpPageFetcher::new(config.request_timeout)?);

    let mut builder = DirectoryBuilder::new(config, fetcher, provider, default_registry()?, cache)?
        .with_refresh(refresh);
    if let Some(path) = output {
        builder = builder.with_output_path(path);
    }

    let directory = builder.build().await.context("Building investor directory")?;
    println!(
        "Wrote {} investors ({} individual, {} institutional, {} FII) to {}",
        directory.len(),
        directory.individual_investors.len(),
        directory.institutional_investors.len(),
        directory.fii_investors.len(),
        builder.output_path().display()
    );
    Ok(())
}

fn load_agent(config: &InvestorConfig, provider: Arc<dyn LLMProvider>) -> anyhow::Result<InvestorAgent> {
    let prompts = default_registry()?;
    Ok(InvestorAgent::from_config(config, provider, &prompts)?)
}

/// Prints streamed text straight to the terminal
struct StdoutHandler;

#[async_trait]
impl ExecutorEventHandler for StdoutHandler {
    fn on_text_delta(&self, delta: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "{delta}");
        let _ = stdout.flush();
    }

    async fn on_tool_start(&self, _id: &str, name: &str, _input: &Value) {
        info!(tool = name, "Looking up data");
    }
}

async fn chat(config: &InvestorConfig, provider: Arc<dyn LLMProvider>) -> anyhow::Result<()> {
    let agent = load_agent(config, provider)?;
    let handler: Arc<dyn ExecutorEventHandler> = Arc::new(StdoutHandler);
    let mut context = Context::new().with_session_id("terminal");

    println!("Avi is ready. Ask about top Indian investors and their portfolios (Ctrl-D to quit).");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }

        if let Err(e) = agent
            .chat(input.to_string(), &mut context, Some(handler.clone()))
            .await
        {
            error!(error = %e, "Turn failed");
            println!("Sorry, something went wrong: {e}");
        }
        println!();
    }
    Ok(())
}
