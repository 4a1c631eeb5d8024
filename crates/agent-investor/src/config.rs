//! Configuration for the investor assistant

use crate::error::{InvestorError, Result};
use agent_utils::{env_or, env_var};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Listing page with the top investors by category
pub const DEFAULT_LISTING_URL: &str = "https://www.moneycontrol.com/india-investors-portfolio/";

/// Origin that relative investor URLs are resolved against
pub const DEFAULT_SITE_ORIGIN: &str = "https://www.moneycontrol.com";

/// Portfolio API base
pub const DEFAULT_PORTFOLIO_API_BASE: &str =
    "https://api.moneycontrol.com/mcapi/v1/portfolio/big-shark";

/// Brave web search endpoint
pub const DEFAULT_SEARCH_API_URL: &str = "https://api.search.brave.com/res/v1/web/search";

/// Desktop browser user agent sent to the portfolio site and API
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Configuration for directory building and the chat agent
#[derive(Debug, Clone)]
pub struct InvestorConfig {
    /// Investor listing page
    pub listing_url: String,

    /// Origin for relative investor URLs
    pub site_origin: String,

    /// Portfolio API base URL
    pub portfolio_api_base: String,

    /// Web search endpoint
    pub search_api_url: String,

    /// `Auth-Token` for the portfolio API (`MONEY_CONTROL_TOKEN`)
    pub money_control_token: Option<String>,

    /// Brave search key (`BRAVE_API_KEY`); searches return a placeholder without it
    pub brave_api_key: Option<String>,

    /// Where the built directory is written and read (`INVESTORS_FILE`)
    pub investors_file: PathBuf,

    /// Directory holding the cache database
    pub cache_dir: PathBuf,

    /// How long a built directory stays in the cache
    pub cache_ttl: Duration,

    /// Timeout for page and API requests
    pub request_timeout: Duration,

    /// Profile page fetches allowed per minute during enrichment
    pub enrich_rate_per_minute: u32,

    /// Model or Azure deployment name (`AZURE_DEPLOYMENT`)
    pub model: String,

    /// Sampling temperature for chat turns
    pub chat_temperature: f32,

    /// Sampling temperature for directory extraction
    pub extraction_temperature: f32,
}

impl Default for InvestorConfig {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            site_origin: DEFAULT_SITE_ORIGIN.to_string(),
            portfolio_api_base: DEFAULT_PORTFOLIO_API_BASE.to_string(),
            search_api_url: DEFAULT_SEARCH_API_URL.to_string(),
            money_control_token: None,
            brave_api_key: None,
            investors_file: PathBuf::from("data/investors.json"),
            cache_dir: std::env::temp_dir().join("structured_data_cache"),
            cache_ttl: Duration::from_secs(30 * 60),
            request_timeout: Duration::from_secs(30),
            enrich_rate_per_minute: 120,
            model: "gpt-4o".to_string(),
            chat_temperature: 0.3,
            extraction_temperature: 0.2,
        }
    }
}

impl InvestorConfig {
    /// Create a new configuration builder
    pub fn builder() -> InvestorConfigBuilder {
        InvestorConfigBuilder::default()
    }

    /// Defaults overridden by environment variables
    ///
    /// Reads `MONEY_CONTROL_TOKEN`, `BRAVE_API_KEY`, `INVESTORS_FILE` and
    /// `AZURE_DEPLOYMENT`. Call [`agent_utils::load_dotenv`] first to pick up
    /// a `.env` file.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            money_control_token: env_var("MONEY_CONTROL_TOKEN"),
            brave_api_key: env_var("BRAVE_API_KEY"),
            investors_file: env_var("INVESTORS_FILE")
                .map_or(defaults.investors_file.clone(), PathBuf::from),
            model: env_or("AZURE_DEPLOYMENT", &defaults.model),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("listing_url", &self.listing_url),
            ("site_origin", &self.site_origin),
            ("portfolio_api_base", &self.portfolio_api_base),
            ("search_api_url", &self.search_api_url),
        ] {
            Url::parse(value)
                .map_err(|e| InvestorError::Config(format!("{name} '{value}' is not a URL: {e}")))?;
        }

        if self.enrich_rate_per_minute == 0 {
            return Err(InvestorError::Config(
                "enrich_rate_per_minute must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(InvestorError::Config(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if self.model.trim().is_empty() {
            return Err(InvestorError::Config("model must not be empty".to_string()));
        }

        Ok(())
    }

    /// Path of the cache database
    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join("cache.sqlite3")
    }
}

/// Builder for InvestorConfig
#[derive(Debug, Default)]
pub struct InvestorConfigBuilder {
    listing_url: Option<String>,
    site_origin: Option<String>,
    portfolio_api_base: Option<String>,
    search_api_url: Option<String>,
    money_control_token: Option<String>,
    brave_api_key: Option<String>,
    investors_file: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    cache_ttl: Option<Duration>,
    request_timeout: Option<Duration>,
    enrich_rate_per_minute: Option<u32>,
    model: Option<String>,
}

impl InvestorConfigBuilder {
    /// Set the listing page URL
    pub fn listing_url(mut self, url: impl Into<String>) -> Self {
        self.listing_url = Some(url.into());
        self
    }

    /// Set the origin for relative investor URLs
    pub fn site_origin(mut self, origin: impl Into<String>) -> Self {
        self.site_origin = Some(origin.into());
        self
    }

    /// Set the portfolio API base URL
    pub fn portfolio_api_base(mut self, url: impl Into<String>) -> Self {
        self.portfolio_api_base = Some(url.into());
        self
    }

    /// Set the web search endpoint
    pub fn search_api_url(mut self, url: impl Into<String>) -> Self {
        self.search_api_url = Some(url.into());
        self
    }

    /// Set the portfolio API token
    pub fn money_control_token(mut self, token: impl Into<String>) -> Self {
        self.money_control_token = Some(token.into());
        self
    }

    /// Set the Brave search key
    pub fn brave_api_key(mut self, key: impl Into<String>) -> Self {
        self.brave_api_key = Some(key.into());
        self
    }

    /// Set the directory file path
    pub fn investors_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.investors_file = Some(path.into());
        self
    }

    /// Set the cache directory
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Set the cache TTL
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Set the request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the profile fetch rate
    pub fn enrich_rate_per_minute(mut self, rate: u32) -> Self {
        self.enrich_rate_per_minute = Some(rate);
        self
    }

    /// Set the model or deployment name
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<InvestorConfig> {
        let defaults = InvestorConfig::default();

        let config = InvestorConfig {
            listing_url: self.listing_url.unwrap_or(defaults.listing_url),
            site_origin: self.site_origin.unwrap_or(defaults.site_origin),
            portfolio_api_base: self.portfolio_api_base.unwrap_or(defaults.portfolio_api_base),
            search_api_url: self.search_api_url.unwrap_or(defaults.search_api_url),
            money_control_token: self.money_control_token,
            brave_api_key: self.brave_api_key,
            investors_file: self.investors_file.unwrap_or(defaults.investors_file),
            cache_dir: self.cache_dir.unwrap_or(defaults.cache_dir),
            cache_ttl: self.cache_ttl.unwrap_or(defaults.cache_ttl),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            enrich_rate_per_minute: self
                .enrich_rate_per_minute
                .unwrap_or(defaults.enrich_rate_per_minute),
            model: self.model.unwrap_or(defaults.model),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}
