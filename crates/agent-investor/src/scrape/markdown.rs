//! HTML to markdown-ish text for the extraction prompt

use crate::error::{InvestorError, Result};

const LINE_WIDTH: usize = 120;

/// Convert page markup to plain text, keeping links as footnotes
pub fn html_to_markdown(html: &str) -> Result<String> {
    html2text::from_read(html.as_bytes(), LINE_WIDTH)
        .map_err(|e| InvestorError::Scrape(format!("HTML conversion failed: {e}")))
}
