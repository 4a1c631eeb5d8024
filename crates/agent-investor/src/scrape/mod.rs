//! Scraping pipeline: fetch pages, convert to markdown, extract, enrich

pub mod enricher;
pub mod extractor;
pub mod fetcher;
pub mod markdown;

pub use enricher::{NO_PID, PortfolioIdEnricher, extract_pid};
pub use extractor::StructuredExtractor;
pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use markdown::html_to_markdown;
