//! Clients for the live portfolio and web search APIs

pub mod portfolio;
pub mod search;

pub use portfolio::{PortfolioClient, project_history, strip_sub_data};
pub use search::{BraveSearchClient, NO_RESULTS, PLACEHOLDER_RESULT, format_results, top_results};
