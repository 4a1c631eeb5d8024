//! Portfolio-id enrichment from investor profile pages

use crate::error::{InvestorError, Result};
use crate::models::{InvestorCategory, InvestorDirectory};
use crate::scrape::PageFetcher;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use regex::Regex;
use std::num::NonZeroU32;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Stored when a profile page has no portfolio id field
pub const NO_PID: &str = "No PID";

const ENTITY_DECODE_WIDTH: usize = 1024;

static INPUT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<input\b[^>]*>").expect("valid regex"));
// Attribute names must follow whitespace so `data-id` or `data-value` never match
static PID_ID_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\sid\s*=\s*["']pid["']"#).expect("valid regex"));
static VALUE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\svalue\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

/// Value of the `<input id="pid">` field, or [`NO_PID`]
pub fn extract_pid(html: &str) -> String {
    INPUT_TAG
        .find_iter(html)
        .map(|tag| tag.as_str())
        .find(|tag| PID_ID_ATTR.is_match(tag))
        .and_then(|tag| VALUE_ATTR.captures(tag))
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map_or_else(|| NO_PID.to_string(), |value| decode_entities(value.as_str()))
}

/// Resolve character references (`&amp;`, `&#39;`) in an attribute value
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    match html2text::from_read(raw.as_bytes(), ENTITY_DECODE_WIDTH) {
        Ok(text) => text.trim_end_matches('\n').to_string(),
        Err(e) => {
            warn!(error = %e, value = raw, "Could not decode pid value, keeping it as-is");
            raw.to_string()
        }
    }
}

/// Fills in each investor's portfolio id by scraping their profile page
pub struct PortfolioIdEnricher {
    fetcher: Arc<dyn PageFetcher>,
    rate_limiter: SharedRateLimiter,
}

impl PortfolioIdEnricher {
    /// Create an enricher allowing `rate_per_minute` page fetches per minute
    pub fn new(fetcher: Arc<dyn PageFetcher>, rate_per_minute: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(rate_per_minute).unwrap_or(NonZeroU32::MIN));
        Self {
            fetcher,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Enrich every investor in place
    ///
    /// Categories are visited individual, institutional, then FII, keeping
    /// list order. The first failed fetch aborts with
    /// [`InvestorError::Enrichment`].
    pub async fn enrich(&self, directory: &mut InvestorDirectory) -> Result<()> {
        let mut missing = 0usize;

        for category in InvestorCategory::ALL {
            for investor in directory.category_mut(category) {
                self.rate_limiter.until_ready().await;

                let html = self.fetcher.fetch(&investor.url).await.map_err(|e| {
                    InvestorError::Enrichment {
                        investor: investor.name.clone(),
                        reason: e.to_string(),
                    }
                })?;

                let pid = extract_pid(&html);
                if pid == NO_PID {
                    missing += 1;
                    warn!(investor = %investor.name, url = %investor.url, "Profile page has no portfolio id");
                }
                debug!(investor = %investor.name, %category, pid = %pid, "Enriched investor");
                investor.portfolio_identifier = Some(pid);
            }
        }

        info!(investors = directory.len(), missing, "Portfolio id enrichment finished");
        Ok(())
    }
}
