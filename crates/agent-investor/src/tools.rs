//! Agent tools over the investor directory and the live APIs
//!
//! API failures never reach the executor as errors: each tool logs the cause
//! and hands the model a short `{"error": "..."}` payload instead. Only
//! malformed arguments are reported as [`agent_core::Error::InvalidInput`].

use crate::api::{BraveSearchClient, PortfolioClient};
use crate::error::InvestorError;
use crate::models::{InvestorCategory, InvestorDirectory, de_display_string};
use agent_core::{Error as AgentError, Result as AgentResult};
use agent_llm::tools::schema;
use agent_tools::{Tool, ToolRegistry};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

pub const LIST_INVESTORS: &str = "get_top_indian_investor_list";
pub const PORTFOLIO_OVERVIEW: &str = "get_investor_portfolio_overview";
pub const INVESTOR_HOLDINGS: &str = "get_investor_holdings";
pub const HOLDING_HISTORY: &str = "get_holding_history";
pub const SEARCH_WEB: &str = "search_web";

const PORTFOLIO_ID_HELP: &str = "The portfolio ID of the investor ('pid'), taken from the \
    'get_top_indian_investor_list' tool, for example \"584333\". Don't make up the portfolio_id.";

/// Everything the tools need, built once at start-up
#[derive(Clone)]
pub struct AgentDeps {
    pub portfolio: Arc<PortfolioClient>,
    pub search: Arc<BraveSearchClient>,
    pub directory: Arc<InvestorDirectory>,
}

/// Register all five tools; `today` goes into the overview description
pub fn register_tools(registry: &ToolRegistry, deps: &AgentDeps, today: NaiveDate) {
    registry.register(Arc::new(InvestorListTool {
        directory: deps.directory.clone(),
    }));
    registry.register(Arc::new(PortfolioOverviewTool::new(deps.portfolio.clone(), today)));
    registry.register(Arc::new(InvestorHoldingsTool {
        portfolio: deps.portfolio.clone(),
    }));
    registry.register(Arc::new(HoldingHistoryTool {
        portfolio: deps.portfolio.clone(),
    }));
    registry.register(Arc::new(WebSearchTool {
        search: deps.search.clone(),
    }));
}

fn parse_params<T: DeserializeOwned>(tool: &str, params: Value) -> AgentResult<T> {
    serde_json::from_value(params)
        .map_err(|e| AgentError::InvalidInput(format!("{tool}: invalid parameters: {e}")))
}

fn to_payload<T: Serialize>(value: T) -> AgentResult<Value> {
    serde_json::to_value(value).map_err(|e| AgentError::ProcessingFailed(e.to_string()))
}

fn error_payload(message: &str) -> Value {
    json!({ "error": message })
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default)]
    category: InvestorCategory,
}

/// Investors of one category, read from the local directory
pub struct InvestorListTool {
    directory: Arc<InvestorDirectory>,
}

#[async_trait]
impl Tool for InvestorListTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: ListParams = parse_params(LIST_INVESTORS, params)?;
        let investors = self.directory.category(params.category);
        info!(tool = LIST_INVESTORS, category = %params.category, count = investors.len(), "Tool called");
        to_payload(investors)
    }

    fn name(&self) -> &str {
        LIST_INVESTORS
    }

    fn description(&self) -> &str {
        "Get the top Indian investors list. Returns the name, company holdings, net worth, \
         profile URL and portfolio ID ('pid') of each investor in the category."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({
                "category": schema::string_enum(
                    "The category of investors to retrieve",
                    &InvestorCategory::ALL.map(InvestorCategory::as_str),
                )
            }),
            &["category"],
        )
    }
}

#[derive(Debug, Deserialize)]
struct PortfolioParams {
    #[serde(deserialize_with = "de_display_string")]
    portfolio_id: String,
}

/// Fresh entries and exits over the last quarter
pub struct PortfolioOverviewTool {
    portfolio: Arc<PortfolioClient>,
    description: String,
}

impl PortfolioOverviewTool {
    fn new(portfolio: Arc<PortfolioClient>, today: NaiveDate) -> Self {
        let description = format!(
            "Get the overview of an investor's portfolio. Gives fresh entry and exit in portfolio \
             in last quarter. Note - Group Purchase and Sale data while responding to the user. \
             The current date is: {}, overview is of last quarter, mention quarter in response.",
            today.format("%Y-%m-%d")
        );
        Self {
            portfolio,
            description,
        }
    }
}

#[async_trait]
impl Tool for PortfolioOverviewTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: PortfolioParams = parse_params(PORTFOLIO_OVERVIEW, params)?;
        info!(tool = PORTFOLIO_OVERVIEW, portfolio_id = %params.portfolio_id, "Tool called");

        Ok(match self.portfolio.overview(&params.portfolio_id).await {
            Ok(overview) => overview,
            Err(e @ InvestorError::Parse(_)) => {
                warn!(error = %e, "Portfolio overview was not JSON");
                error_payload("Error decoding JSON response.")
            }
            Err(e) => {
                warn!(error = %e, "Portfolio overview failed");
                error_payload("An unexpected error occurred while retrieving data.")
            }
        })
    }

    fn name(&self) -> &str {
        PORTFOLIO_OVERVIEW
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({ "portfolio_id": schema::string(PORTFOLIO_ID_HELP) }),
            &["portfolio_id"],
        )
    }
}

/// Current holdings, without the per-row breakdown
pub struct InvestorHoldingsTool {
    portfolio: Arc<PortfolioClient>,
}

#[async_trait]
impl Tool for InvestorHoldingsTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: PortfolioParams = parse_params(INVESTOR_HOLDINGS, params)?;
        info!(tool = INVESTOR_HOLDINGS, portfolio_id = %params.portfolio_id, "Tool called");

        match self.portfolio.holdings(&params.portfolio_id).await {
            Ok(holdings) => to_payload(holdings),
            Err(e) => {
                warn!(error = %e, "Holdings lookup failed");
                Ok(error_payload("Unable to retrieve holdings at this time."))
            }
        }
    }

    fn name(&self) -> &str {
        INVESTOR_HOLDINGS
    }

    fn description(&self) -> &str {
        "Get detailed investor portfolio holdings. Mention the holding percentage and the change \
         in holding percentage compared to the previous quarter. Important keys in each row: \
         'nseCode' is the NSE stock code, 'holdingPer' the holding percentage, and 'changePrev' \
         the change since the previous quarter. If 'changePrev' is 0, mention it as \"No change\". \
         If 'changePrev' is \"New\", highlight it in the output as \"New\"."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({ "portfolio_id": schema::string(PORTFOLIO_ID_HELP) }),
            &["portfolio_id"],
        )
    }
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    #[serde(deserialize_with = "de_display_string")]
    portfolio_id: String,
    #[serde(rename = "nseCode")]
    nse_code: String,
}

/// Quarterly position of an investor in one stock
pub struct HoldingHistoryTool {
    portfolio: Arc<PortfolioClient>,
}

#[async_trait]
impl Tool for HoldingHistoryTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: HistoryParams = parse_params(HOLDING_HISTORY, params)?;
        info!(
            tool = HOLDING_HISTORY,
            portfolio_id = %params.portfolio_id,
            nse_code = %params.nse_code,
            "Tool called"
        );

        match self
            .portfolio
            .holding_history(&params.portfolio_id, &params.nse_code)
            .await
        {
            Ok(history) => to_payload(history),
            Err(e @ InvestorError::Parse(_)) => {
                warn!(error = %e, "Holding history response was unusable");
                Ok(error_payload(
                    "Unable to retrieve holding history at this time. Invalid JSON response.",
                ))
            }
            Err(e) => {
                warn!(error = %e, "Holding history lookup failed");
                Ok(error_payload("Unable to retrieve holding history at this time."))
            }
        }
    }

    fn name(&self) -> &str {
        HOLDING_HISTORY
    }

    fn description(&self) -> &str {
        "Get the history of portfolio holdings for a particular stock by an investor. The data \
         includes the quarter, holding percentage, and the client name under which the investment \
         was made. Investors may invest through different associates, so the same investor might \
         appear under different names. When analyzing, treat them as the same investor."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({
                "portfolio_id": schema::string(PORTFOLIO_ID_HELP),
                "nseCode": schema::string(
                    "The NSE stock code, taken from 'get_investor_holdings'. Don't make it up."
                ),
            }),
            &["portfolio_id", "nseCode"],
        )
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    web_query: String,
}

/// Web search for context the APIs don't carry
pub struct WebSearchTool {
    search: Arc<BraveSearchClient>,
}

#[async_trait]
impl Tool for WebSearchTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: SearchParams = parse_params(SEARCH_WEB, params)?;
        info!(tool = SEARCH_WEB, query = %params.web_query, "Tool called");

        match self.search.search(&params.web_query).await {
            Ok(text) => Ok(Value::String(text)),
            Err(e) => {
                warn!(error = %e, "Web search failed");
                Ok(error_payload(&format!("Web search failed: {e}")))
            }
        }
    }

    fn name(&self) -> &str {
        SEARCH_WEB
    }

    fn description(&self) -> &str {
        "Search the web given a query defined to answer the user's question."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({ "web_query": schema::string("The query for the web search") }),
            &["web_query"],
        )
    }
}
