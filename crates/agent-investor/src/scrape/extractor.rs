//! LLM-driven extraction of the investor directory from listing markdown

use crate::error::{InvestorError, Result};
use crate::models::{Investor, InvestorCategory, InvestorDirectory, format_last_updated};
use crate::prompts::{EXTRACTION_REQUEST, EXTRACTION_SYSTEM};
use agent_llm::{CompletionRequest, LLMProvider, Message, ResponseFormat};
use agent_prompt::PromptRegistry;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Upper bound on the reply; the full listing runs to a few thousand tokens
const EXTRACTION_MAX_TOKENS: usize = 8192;

#[derive(Deserialize)]
struct ExtractedDirectory {
    individual_investors: Vec<Investor>,
    institutional_investors: Vec<Investor>,
    fii_investors: Vec<Investor>,
}

/// Turns listing markdown into an [`InvestorDirectory`] with one model call
pub struct StructuredExtractor {
    provider: Arc<dyn LLMProvider>,
    prompts: Arc<PromptRegistry>,
    model: String,
    temperature: f32,
    site_origin: Url,
}

impl StructuredExtractor {
    /// Create an extractor resolving relative URLs against `site_origin`
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        prompts: Arc<PromptRegistry>,
        model: impl Into<String>,
        site_origin: &str,
    ) -> Result<Self> {
        let site_origin = Url::parse(site_origin)
            .map_err(|e| InvestorError::Config(format!("Invalid site origin '{site_origin}': {e}")))?;

        Ok(Self {
            provider,
            prompts,
            model: model.into(),
            temperature: 0.2,
            site_origin,
        })
    }

    /// Override the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Ask the model to structure `markdown` and parse its reply
    pub async fn extract(&self, markdown: &str) -> Result<InvestorDirectory> {
        let origin = self.site_origin.as_str().trim_end_matches('/');
        let vars = json!({ "markdown": markdown, "origin": origin });
        let system = self.prompts.render(EXTRACTION_SYSTEM, &vars)?;
        let prompt = self.prompts.render(EXTRACTION_REQUEST, &vars)?;

        let request = CompletionRequest::builder(&self.model)
            .system(system)
            .add_message(Message::user(prompt))
            .max_tokens(EXTRACTION_MAX_TOKENS)
            .temperature(self.temperature)
            .response_format(ResponseFormat::JsonObject)
            .build();

        debug!(model = %self.model, markdown_len = markdown.len(), "Requesting directory extraction");
        let response = self.provider.complete(request).await?;
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Extraction reply received"
        );

        let reply = response
            .message
            .text()
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| InvestorError::Extraction("Model returned no content".to_string()))?;

        let directory = self.parse(&reply, Utc::now())?;
        info!(
            individual = directory.individual_investors.len(),
            institutional = directory.institutional_investors.len(),
            fii = directory.fii_investors.len(),
            "Extracted investor directory"
        );
        Ok(directory)
    }

    /// Parse a model reply into a directory stamped with `now`
    pub fn parse(&self, reply: &str, now: DateTime<Utc>) -> Result<InvestorDirectory> {
        let extracted: ExtractedDirectory = serde_json::from_str(reply.trim())
            .map_err(|e| InvestorError::Extraction(format!("Reply is not a valid directory: {e}")))?;

        let mut directory = InvestorDirectory {
            individual_investors: extracted.individual_investors,
            institutional_investors: extracted.institutional_investors,
            fii_investors: extracted.fii_investors,
            last_updated: format_last_updated(now),
        };

        for category in InvestorCategory::ALL {
            for investor in directory.category_mut(category) {
                investor.url = self.absolutize(&investor.url)?;
            }
        }

        Ok(directory)
    }

    fn absolutize(&self, url: &str) -> Result<String> {
        self.site_origin
            .join(url.trim())
            .map(String::from)
            .map_err(|e| InvestorError::Extraction(format!("Invalid investor URL '{url}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::default_registry;
    use agent_llm::{CompletionResponse, StopReason, TokenUsage};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    struct CannedProvider {
        reply: String,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl CannedProvider {
        fn new(reply: serde_json::Value) -> Self {
            Self {
                reply: reply.to_string(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for CannedProvider {
        async fn complete(&self, request: CompletionRequest) -> agent_llm::Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request);
            Ok(CompletionResponse {
                message: Message::assistant(self.reply.clone()),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn extractor(provider: Arc<CannedProvider>) -> StructuredExtractor {
        StructuredExtractor::new(
            provider,
            default_registry().unwrap(),
            "gpt-4o",
            "https://www.moneycontrol.com",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_extracts_listing_row() {
        let provider = Arc::new(CannedProvider::new(json!({
            "individual_investors": [{
                "name": "Jane Doe",
                "company_holdings": "5",
                "net_worth": "1,200",
                "url": "https://www.moneycontrol.com/india-investors-portfolio/jane-doe"
            }],
            "institutional_investors": [],
            "fii_investors": []
        })));

        let directory = extractor(provider.clone())
            .extract("| Jane Doe | 5 | 1,200 |")
            .await
            .unwrap();

        let jane = &directory.individual_investors[0];
        assert_eq!(jane.name, "Jane Doe");
        assert_eq!(jane.company_holdings, 5);
        assert_eq!(jane.net_worth, "1,200");
        assert!(jane.portfolio_identifier.is_none());
        assert!(directory.institutional_investors.is_empty());
        assert!(directory.last_updated.ends_with(" UTC"));

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].temperature, Some(0.2));
        assert_eq!(requests[0].response_format, Some(ResponseFormat::JsonObject));
        assert!(
            requests[0]
                .system
                .as_deref()
                .unwrap()
                .contains("Always return the data as a JSON object")
        );
        assert!(requests[0].messages[0].text().unwrap().contains("| Jane Doe | 5 | 1,200 |"));
    }

    #[test]
    fn test_relative_urls_become_absolute() {
        let extractor = extractor(Arc::new(CannedProvider::new(json!({}))));
        let reply = json!({
            "individual_investors": [{
                "name": "Jane Doe",
                "company_holdings": 5,
                "net_worth": 1200,
                "url": "/india-investors-portfolio/jane-doe"
            }],
            "institutional_investors": [],
            "fii_investors": []
        });
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();

        let directory = extractor.parse(&reply.to_string(), now).unwrap();
        let jane = &directory.individual_investors[0];
        assert_eq!(jane.url, "https://www.moneycontrol.com/india-investors-portfolio/jane-doe");
        assert_eq!(jane.net_worth, "1200");
        assert_eq!(directory.last_updated, "2025-03-01 09:30:00 UTC");
    }

    #[test]
    fn test_missing_category_is_extraction_error() {
        let extractor = extractor(Arc::new(CannedProvider::new(json!({}))));
        let reply = json!({ "individual_investors": [], "fii_investors": [] }).to_string();

        let err = extractor.parse(&reply, Utc::now()).unwrap_err();
        assert!(matches!(err, InvestorError::Extraction(_)));
    }

    #[test]
    fn test_non_numeric_holdings_is_extraction_error() {
        let extractor = extractor(Arc::new(CannedProvider::new(json!({}))));
        let reply = json!({
            "individual_investors": [{
                "name": "Jane Doe",
                "company_holdings": "several",
                "net_worth": "1,200",
                "url": "/jane-doe"
            }],
            "institutional_investors": [],
            "fii_investors": []
        })
        .to_string();

        assert!(matches!(
            extractor.parse(&reply, Utc::now()),
            Err(InvestorError::Extraction(_))
        ));
        assert!(matches!(
            extractor.parse("not json", Utc::now()),
            Err(InvestorError::Extraction(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_reply_is_extraction_error() {
        let provider = Arc::new(CannedProvider {
            reply: "  ".to_string(),
            requests: Mutex::new(Vec::new()),
        });
        let err = extractor(provider).extract("markdown").await.unwrap_err();
        assert!(matches!(err, InvestorError::Extraction(_)));
    }
}
