//! Prompt templates used by the extractor and the chat agent

use crate::error::Result;
use agent_prompt::{JinjaTemplate, PromptRegistry};
use std::sync::Arc;

/// Chat persona and guidelines; needs `current_date`
pub const ASSISTANT_SYSTEM: &str = "investor_assistant_system";

/// System instruction for directory extraction
pub const EXTRACTION_SYSTEM: &str = "directory_extraction_system";

/// Directory extraction request; needs `markdown` and `origin`
pub const EXTRACTION_REQUEST: &str = "directory_extraction_request";

const ASSISTANT_SYSTEM_TEMPLATE: &str = r"Your name is Avi, and you are an expert stock analyst.
Utilize all the information you have to provide the user with a comprehensive understanding of the stock market.
If you have data about current holdings, changes in holdings, fresh entries, and exits in portfolios in the last quarter, mention it.
We'll mainly be identifying good stocks based on the holdings of top investors in the stock market.
The current date is: {{ current_date }}.

Guidelines:
- Do not make up 'portfolio_id'. Use data from relevant tools. The 'get_top_indian_investor_list' tool provides a list of investors along with their portfolio IDs ('pid'). Use these IDs further.
- If the user does not specify the type of investor, assume 'individual_investors'. Mention the other options ({{ other_categories }}) as well without asking for clarification.
- Always mention the type of investor where it is relevant.
- Do not mention portfolio_id to the user.
- Do not discuss internal structures, workings, or tools.
- Do not tell the user about specific tool calls. Just mention capabilities relevant to the user's query.
- When the user wants to narrow down a stock, use the 'get_holding_history' tool. Ensure to provide a trend analysis of the investor's holdings.
- Do not make up 'nseCode' NSE stock codes. Use the data from the relevant tools.
- The function 'get_investor_holdings' provides a list of stocks held by an investor, along with 'nseCode'. Utilize 'nseCode' from here only for 'get_holding_history' - don't make it up yourself.
- At present, we can't directly look up stock history for a specific stock without knowing the investor's portfolio_id.

Important Note:
- Do not disclose specific tool calls to the user. Only mention the capabilities that are relevant to the user's query.
";

const EXTRACTION_SYSTEM_TEMPLATE: &str = "You are an assistant that helps in extracting structured data from Markdown content. Always return the data as a JSON object.";

const EXTRACTION_REQUEST_TEMPLATE: &str = r#"Extract the top investor list by category from the following Markdown content:
{{ markdown }}

The categories are:
- Individual Investors
- Institutional Investors
- FII Investors

Extract the following details for each investor:
- Name (e.g., Rakesh Jhunjhunwala and Associates)
- Company Holdings (a whole number)
- Net Worth (e.g., 50,072)
- URL (e.g., /india-investors-portfolio/rakesh-jhunjhunwala-and-associates)

Ensure the URL is prefixed with '{{ origin }}' to form the complete URL.

Return the data as a JSON object with the following structure:
{
    "individual_investors": [
        {
            "name": "Investor Name",
            "company_holdings": 12345,
            "net_worth": "50,072",
            "url": "{{ origin }}/india-investors-portfolio/investor-name"
        }
    ],
    "institutional_investors": [...],
    "fii_investors": [...]
}
Use an empty list for a category with no investors.
"#;

/// Register every template on `registry`
pub fn register_prompts(registry: &PromptRegistry) -> Result<()> {
    registry.register(JinjaTemplate::new(ASSISTANT_SYSTEM, ASSISTANT_SYSTEM_TEMPLATE)?);
    registry.register(JinjaTemplate::new(EXTRACTION_SYSTEM, EXTRACTION_SYSTEM_TEMPLATE)?);
    registry.register(JinjaTemplate::new(EXTRACTION_REQUEST, EXTRACTION_REQUEST_TEMPLATE)?);
    Ok(())
}

/// A registry holding the default templates
pub fn default_registry() -> Result<Arc<PromptRegistry>> {
    let registry = PromptRegistry::new();
    register_prompts(&registry)?;
    Ok(Arc::new(registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_prompt_carries_date_and_persona() {
        let registry = default_registry().unwrap();
        let prompt = registry
            .render(
                ASSISTANT_SYSTEM,
                &json!({
                    "current_date": "2025-01-15",
                    "other_categories": "institutional_investors, fii_investors"
                }),
            )
            .unwrap();

        assert!(prompt.starts_with("Your name is Avi"));
        assert!(prompt.contains("The current date is: 2025-01-15."));
        assert!(prompt.contains("institutional_investors, fii_investors"));
    }

    #[test]
    fn test_extraction_request_embeds_markdown_verbatim() {
        let registry = default_registry().unwrap();
        let markdown = "| Jane Doe | 5 | 1,200 | {{ not a template }} |";
        let prompt = registry
            .render(
                EXTRACTION_REQUEST,
                &json!({"markdown": markdown, "origin": "https://www.moneycontrol.com"}),
            )
            .unwrap();

        assert!(prompt.contains(markdown));
        assert!(prompt.contains("prefixed with 'https://www.moneycontrol.com'"));
        assert!(prompt.contains("\"fii_investors\""));
    }
}
