//! Portfolio client and tools against a local fake of the upstream API

use agent_investor::api::PortfolioClient;
use agent_investor::tools::{AgentDeps, HOLDING_HISTORY, INVESTOR_HOLDINGS, register_tools};
use agent_investor::{BraveSearchClient, InvestorConfig, InvestorDirectory, InvestorError};
use agent_tools::ToolRegistry;
use axum::Router;
use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

async fn holdings_history(Query(params): Query<HashMap<String, String>>) -> axum::Json<Value> {
    assert_eq!(params.get("portfolioId").map(String::as_str), Some("584333"));
    assert_eq!(params.get("nseId").map(String::as_str), Some("TITAN"));
    axum::Json(json!({
        "success": 1,
        "data": [
            {"quarter": "Dec 2024", "holdingPer": "5.05", "clientName": "Jane Doe", "quantity": "4,48,50,970", "value": 1234.5},
            {"quarter": "Sep 2024", "holdingPer": "5.10", "clientName": "Jane Doe", "quantity": "4,52,50,970", "value": 1300.0},
            {"quarter": "Jun 2024", "holdingPer": 4.9, "clientName": "Jane Doe & Associates", "quantity": "4,40,00,000", "value": 1100.0}
        ]
    }))
}

async fn holdings(headers: HeaderMap) -> Result<axum::Json<Value>, StatusCode> {
    if headers.get("auth-token").and_then(|v| v.to_str().ok()) != Some("test-token") {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(axum::Json(json!({
        "success": 1,
        "data": {
            "dataList": [
                {"nseCode": "TITAN", "holdingPer": "5.05", "changePrev": "0", "subData": [{"quarter": "Dec 2024"}]},
                {"nseCode": "CRISIL", "holdingPer": "5.48", "changePrev": "New", "subData": [{"quarter": "Dec 2024"}]}
            ]
        }
    })))
}

async fn overview() -> &'static str {
    "<html>maintenance</html>"
}

async fn spawn_upstream() -> String {
    let app = Router::new()
        .route("/big-shark/holdings-history", get(holdings_history))
        .route("/big-shark/holdings", get(holdings))
        .route("/big-shark/overview-holding", get(overview));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/big-shark")
}

fn config(base: &str, token: Option<&str>) -> InvestorConfig {
    let mut builder = InvestorConfig::builder().portfolio_api_base(base);
    if let Some(token) = token {
        builder = builder.money_control_token(token);
    }
    builder.build().unwrap()
}

#[tokio::test]
async fn test_history_projection_matches_upstream_rows() {
    let base = spawn_upstream().await;
    let client = PortfolioClient::new(&config(&base, Some("test-token"))).unwrap();

    let history = client.holding_history("584333", "TITAN").await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].holding_per, "4.9");

    let value = serde_json::to_value(&history).unwrap();
    for row in value.as_array().unwrap() {
        let mut keys: Vec<_> = row.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["clientName", "holdingPer", "quarter"]);
    }
}

#[tokio::test]
async fn test_holdings_drop_sub_data() {
    let base = spawn_upstream().await;
    let client = PortfolioClient::new(&config(&base, Some("test-token"))).unwrap();

    let holdings = client.holdings("584333").await.unwrap();
    let rows = holdings.data["dataList"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.get("subData").is_none()));
    assert_eq!(rows[1]["changePrev"], "New");
}

#[tokio::test]
async fn test_upstream_errors_map_to_fetch_and_parse() {
    let base = spawn_upstream().await;
    let client = PortfolioClient::new(&config(&base, None)).unwrap();

    let err = client.holdings("584333").await.unwrap_err();
    assert!(matches!(err, InvestorError::Fetch { reason, .. } if reason.contains("401")));

    let err = client.overview("584333").await.unwrap_err();
    assert!(matches!(err, InvestorError::Parse(_)));
}

#[tokio::test]
async fn test_tools_over_live_client() {
    let base = spawn_upstream().await;
    let config = config(&base, Some("test-token"));
    let deps = AgentDeps {
        portfolio: Arc::new(PortfolioClient::new(&config).unwrap()),
        search: Arc::new(BraveSearchClient::new(&config).unwrap()),
        directory: Arc::new(InvestorDirectory::empty(chrono::Utc::now())),
    };
    let registry = ToolRegistry::new();
    register_tools(&registry, &deps, chrono::NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());

    let history = registry
        .dispatch(HOLDING_HISTORY, json!({"portfolio_id": "584333", "nseCode": "TITAN"}))
        .await
        .unwrap();
    assert_eq!(history.as_array().unwrap().len(), 3);
    assert_eq!(history[0], json!({"quarter": "Dec 2024", "holdingPer": "5.05", "clientName": "Jane Doe"}));

    let holdings = registry
        .dispatch(INVESTOR_HOLDINGS, json!({"portfolio_id": 584_333}))
        .await
        .unwrap();
    assert_eq!(holdings["success"], 1);
    assert!(holdings["data"]["dataList"][0].get("subData").is_none());

    let overview = registry
        .dispatch("get_investor_portfolio_overview", json!({"portfolio_id": "584333"}))
        .await
        .unwrap();
    assert_eq!(overview, json!({"error": "Error decoding JSON response."}));
}
