//! Portfolio API client
//!
//! Three read-only endpoints under the portfolio base URL, all keyed by the
//! investor's portfolio id:
//!
//! - `/overview-holding`: fresh entries and exits in the last quarter
//! - `/holdings`: current holdings, trimmed of per-row `subData`
//! - `/holdings-history`: quarterly position in one stock

use crate::config::{BROWSER_USER_AGENT, InvestorConfig};
use crate::error::{InvestorError, Result};
use crate::models::{HoldingHistoryEntry, PortfolioHolding};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::debug;

/// Client for the portfolio API
pub struct PortfolioClient {
    client: Client,
    base_url: String,
}

impl PortfolioClient {
    /// Create a client from configuration
    ///
    /// Without a token, requests are still sent and rejected upstream.
    pub fn new(config: &InvestorConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &config.money_control_token {
            let value = HeaderValue::from_str(token)
                .map_err(|e| InvestorError::Config(format!("Invalid MONEY_CONTROL_TOKEN: {e}")))?;
            headers.insert("Auth-Token", value);
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self::with_client(client, &config.portfolio_api_base))
    }

    /// Use a preconfigured HTTP client
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Entries and exits in the investor's portfolio over the last quarter
    pub async fn overview(&self, portfolio_id: &str) -> Result<Value> {
        self.get_json(
            "overview-holding",
            &[("page", "1"), ("portfolioId", portfolio_id), ("deviceType", "W")],
        )
        .await
    }

    /// Current holdings with the per-row `subData` breakdown removed
    pub async fn holdings(&self, portfolio_id: &str) -> Result<PortfolioHolding> {
        let mut body = self
            .get_json("holdings", &[("portfolioId", portfolio_id), ("deviceType", "W")])
            .await?;

        let rows = strip_sub_data(&mut body)?;
        debug!(portfolio_id, rows, "Trimmed holdings");

        serde_json::from_value(body)
            .map_err(|e| InvestorError::Parse(format!("Holdings response: {e}")))
    }

    /// Quarterly holding percentage of one stock by the investor
    pub async fn holding_history(
        &self,
        portfolio_id: &str,
        nse_code: &str,
    ) -> Result<Vec<HoldingHistoryEntry>> {
        let body = self
            .get_json(
                "holdings-history",
                &[("portfolioId", portfolio_id), ("nseId", nse_code)],
            )
            .await?;

        project_history(&body)
    }

    async fn get_json(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!(url = %url, ?query, "Calling portfolio API");

        let fetch_error = |reason: String| InvestorError::Fetch {
            url: url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {status}")));
        }

        let text = response.text().await.map_err(|e| fetch_error(e.to_string()))?;
        serde_json::from_str(&text)
            .map_err(|e| InvestorError::Parse(format!("{endpoint} returned invalid JSON: {e}")))
    }
}

/// Remove `subData` from every row of `data.dataList`, returning the row count
pub fn strip_sub_data(body: &mut Value) -> Result<usize> {
    let rows = body
        .pointer_mut("/data/dataList")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| InvestorError::Parse("Holdings response has no data.dataList".to_string()))?;

    for row in rows.iter_mut() {
        if let Some(fields) = row.as_object_mut() {
            fields.remove("subData");
        }
    }
    Ok(rows.len())
}

/// Keep only quarter, holding percentage and client name of each history row
pub fn project_history(body: &Value) -> Result<Vec<HoldingHistoryEntry>> {
    let rows = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| InvestorError::Parse("History response has no data list".to_string()))?;

    rows.iter()
        .map(|row| {
            serde_json::from_value(row.clone())
                .map_err(|e| InvestorError::Parse(format!("History entry: {e}")))
        })
        .collect()
}
