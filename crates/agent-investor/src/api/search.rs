//! Brave web search client

use crate::config::InvestorConfig;
use crate::error::{InvestorError, Result};
use crate::models::SearchResult;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::{debug, warn};

/// Returned when no API key is configured
pub const PLACEHOLDER_RESULT: &str =
    "This is a test web search result. Please provide a Brave API key to get real search results.";

/// Returned when no result has both a title and a description
pub const NO_RESULTS: &str = "No results found for the query.";

/// Results requested from the API
const REQUEST_COUNT: &str = "5";

/// Results considered for the answer
const TOP_RESULTS: usize = 3;

/// Web search over the Brave search API
pub struct BraveSearchClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl BraveSearchClient {
    /// Create a client from configuration
    pub fn new(config: &InvestorConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.search_api_url.clone(),
            api_key: config.brave_api_key.clone(),
        })
    }

    /// Whether real searches are made
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Search the web and format the top hits for the model
    pub async fn search(&self, query: &str) -> Result<String> {
        let Some(api_key) = &self.api_key else {
            warn!("BRAVE_API_KEY not set, returning placeholder search result");
            return Ok(PLACEHOLDER_RESULT.to_string());
        };

        debug!(query, "Searching the web");
        let fetch_error = |reason: String| InvestorError::Fetch {
            url: self.endpoint.clone(),
            reason,
        };

        let response = self
            .client
            .get(&self.endpoint)
            .header("X-Subscription-Token", api_key)
            .header(ACCEPT, "application/json")
            .query(&[
                ("q", query),
                ("count", REQUEST_COUNT),
                ("text_decorations", "true"),
                ("search_lang", "en"),
            ])
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| InvestorError::Parse(format!("Search response: {e}")))?;

        let results = top_results(&body);
        debug!(query, results = results.len(), "Search finished");
        Ok(format_results(&results))
    }
}

/// Usable hits among the first three web results
pub fn top_results(body: &Value) -> Vec<SearchResult> {
    let field = |item: &Value, key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    body.pointer("/web/results")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .take(TOP_RESULTS)
                .map(|item| SearchResult {
                    title: field(item, "title"),
                    summary: field(item, "description"),
                    source: field(item, "url"),
                })
                .filter(|r| !r.title.is_empty() && !r.summary.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Join results as `Title/Summary/Source` blocks, or [`NO_RESULTS`]
pub fn format_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }
    results
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
