//! Data model: the investor directory and portfolio API projections

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Format of [`InvestorDirectory::last_updated`]
pub const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// One investor from the listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investor {
    /// Display name, e.g. "Rakesh Jhunjhunwala and Associates"
    pub name: String,

    /// Number of companies held
    #[serde(deserialize_with = "de_count")]
    pub company_holdings: u64,

    /// Net worth as displayed on the site, e.g. "50,072"
    #[serde(deserialize_with = "de_display_string")]
    pub net_worth: String,

    /// Absolute profile page URL
    pub url: String,

    /// Portfolio API identifier, scraped from the profile page
    #[serde(rename = "pid", default, skip_serializing_if = "Option::is_none")]
    pub portfolio_identifier: Option<String>,
}

/// Investor category as named in the directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestorCategory {
    #[default]
    IndividualInvestors,
    InstitutionalInvestors,
    FiiInvestors,
}

impl InvestorCategory {
    /// All categories, in enrichment order
    pub const ALL: [InvestorCategory; 3] = [
        InvestorCategory::IndividualInvestors,
        InvestorCategory::InstitutionalInvestors,
        InvestorCategory::FiiInvestors,
    ];

    /// Serialized name, e.g. `individual_investors`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IndividualInvestors => "individual_investors",
            Self::InstitutionalInvestors => "institutional_investors",
            Self::FiiInvestors => "fii_investors",
        }
    }
}

impl fmt::Display for InvestorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The scraped, enriched list of top investors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestorDirectory {
    pub individual_investors: Vec<Investor>,
    pub institutional_investors: Vec<Investor>,
    pub fii_investors: Vec<Investor>,
    /// UTC build time, formatted with [`LAST_UPDATED_FORMAT`]
    pub last_updated: String,
}

impl InvestorDirectory {
    /// Empty directory stamped with `at`
    pub fn empty(at: DateTime<Utc>) -> Self {
        Self {
            individual_investors: Vec::new(),
            institutional_investors: Vec::new(),
            fii_investors: Vec::new(),
            last_updated: format_last_updated(at),
        }
    }

    /// Investors of one category
    pub fn category(&self, category: InvestorCategory) -> &[Investor] {
        match category {
            InvestorCategory::IndividualInvestors => &self.individual_investors,
            InvestorCategory::InstitutionalInvestors => &self.institutional_investors,
            InvestorCategory::FiiInvestors => &self.fii_investors,
        }
    }

    /// Mutable investors of one category
    pub fn category_mut(&mut self, category: InvestorCategory) -> &mut Vec<Investor> {
        match category {
            InvestorCategory::IndividualInvestors => &mut self.individual_investors,
            InvestorCategory::InstitutionalInvestors => &mut self.institutional_investors,
            InvestorCategory::FiiInvestors => &mut self.fii_investors,
        }
    }

    /// Total number of investors across categories
    pub fn len(&self) -> usize {
        InvestorCategory::ALL
            .iter()
            .map(|c| self.category(*c).len())
            .sum()
    }

    /// True when no category has investors
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Render a timestamp the way `last_updated` stores it
pub fn format_last_updated(at: DateTime<Utc>) -> String {
    at.format(LAST_UPDATED_FORMAT).to_string()
}

/// Holdings response, passed through to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioHolding {
    #[serde(default)]
    pub success: serde_json::Value,
    pub data: serde_json::Value,
}

/// One quarter of an investor's position in a stock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingHistoryEntry {
    #[serde(deserialize_with = "de_display_string")]
    pub quarter: String,
    #[serde(rename = "holdingPer", deserialize_with = "de_display_string")]
    pub holding_per: String,
    #[serde(rename = "clientName")]
    pub client_name: String,
}

/// A web search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub summary: String,
    pub source: String,
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Title: {}", self.title)?;
        writeln!(f, "Summary: {}", self.summary)?;
        writeln!(f, "Source: {}", self.source)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    String(String),
}

/// Integer count; digit strings such as `"12"` or `"1,024"` are accepted
fn de_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("expected a whole number, got {n}"))),
        NumberOrString::String(s) => s
            .trim()
            .replace(',', "")
            .parse()
            .map_err(|_| D::Error::custom(format!("expected a whole number, got {s:?}"))),
    }
}

/// String field that upstream sometimes sends as a bare number
pub(crate) fn de_display_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    Ok(match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n.to_string(),
        NumberOrString::String(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn investor_json(holdings: serde_json::Value) -> serde_json::Value {
        json!({
            "name": "Jane Doe",
            "company_holdings": holdings,
            "net_worth": "1,200",
            "url": "https://www.moneycontrol.com/india-investors-portfolio/jane-doe"
        })
    }

    #[test]
    fn test_company_holdings_accepts_numeric_strings() {
        let a: Investor = serde_json::from_value(investor_json(json!(5))).unwrap();
        let b: Investor = serde_json::from_value(investor_json(json!("5"))).unwrap();
        let c: Investor = serde_json::from_value(investor_json(json!("1,024"))).unwrap();
        assert_eq!(a.company_holdings, 5);
        assert_eq!(a, b);
        assert_eq!(c.company_holdings, 1024);
        assert!(a.portfolio_identifier.is_none());
    }

    #[test]
    fn test_company_holdings_rejects_non_numbers() {
        assert!(serde_json::from_value::<Investor>(investor_json(json!("many"))).is_err());
        assert!(serde_json::from_value::<Investor>(investor_json(json!(2.5))).is_err());
        assert!(serde_json::from_value::<Investor>(investor_json(json!(-3))).is_err());
    }

    #[test]
    fn test_net_worth_numbers_become_strings() {
        let mut value = investor_json(json!(5));
        value["net_worth"] = json!(1200);
        let investor: Investor = serde_json::from_value(value).unwrap();
        assert_eq!(investor.net_worth, "1200");
    }

    #[test]
    fn test_pid_field_name() {
        let mut investor: Investor = serde_json::from_value(investor_json(json!(5))).unwrap();
        assert!(serde_json::to_value(&investor).unwrap().get("pid").is_none());

        investor.portfolio_identifier = Some("584333".to_string());
        assert_eq!(serde_json::to_value(&investor).unwrap()["pid"], "584333");
    }

    #[test]
    fn test_category_accessors() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let mut directory = InvestorDirectory::empty(at);
        assert_eq!(directory.last_updated, "2025-01-02 03:04:05 UTC");
        assert!(directory.is_empty());

        let investor: Investor = serde_json::from_value(investor_json(json!(5))).unwrap();
        directory
            .category_mut(InvestorCategory::FiiInvestors)
            .push(investor);
        assert_eq!(directory.category(InvestorCategory::FiiInvestors).len(), 1);
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_category_serde_names() {
        let category: InvestorCategory = serde_json::from_value(json!("fii_investors")).unwrap();
        assert_eq!(category, InvestorCategory::FiiInvestors);
        assert_eq!(InvestorCategory::default().to_string(), "individual_investors");
        assert!(serde_json::from_value::<InvestorCategory>(json!("retail")).is_err());
    }

    #[test]
    fn test_history_entry_drops_extra_fields() {
        let entry: HoldingHistoryEntry = serde_json::from_value(json!({
            "quarter": "Sep 2024",
            "holdingPer": 5.1,
            "clientName": "Jane Doe",
            "quantityHeld": "1,000"
        }))
        .unwrap();
        assert_eq!(entry.holding_per, "5.1");
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"quarter": "Sep 2024", "holdingPer": "5.1", "clientName": "Jane Doe"})
        );
    }

    #[test]
    fn test_search_result_display() {
        let result = SearchResult {
            title: "TITAN Q3".to_string(),
            summary: "Results beat estimates".to_string(),
            source: "https://news.example/titan".to_string(),
        };
        assert_eq!(
            result.to_string(),
            "Title: TITAN Q3\nSummary: Results beat estimates\nSource: https://news.example/titan\n"
        );
    }
}
