//! Directory build pipeline: cache, fetch, convert, extract, enrich, persist

use crate::cache::DirectoryCache;
use crate::config::InvestorConfig;
use crate::error::{InvestorError, Result};
use crate::models::InvestorDirectory;
use crate::scrape::{PageFetcher, PortfolioIdEnricher, StructuredExtractor, html_to_markdown};
use agent_llm::LLMProvider;
use agent_prompt::PromptRegistry;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Builds the investor directory, reusing the cached copy while it is fresh
pub struct DirectoryBuilder {
    fetcher: Arc<dyn PageFetcher>,
    extractor: StructuredExtractor,
    enricher: PortfolioIdEnricher,
    cache: Arc<DirectoryCache>,
    listing_url: String,
    output_path: PathBuf,
    cache_ttl: Duration,
    refresh: bool,
}

impl DirectoryBuilder {
    /// Wire a builder from configuration and its collaborators
    pub fn new(
        config: &InvestorConfig,
        fetcher: Arc<dyn PageFetcher>,
        provider: Arc<dyn LLMProvider>,
        prompts: Arc<PromptRegistry>,
        cache: Arc<DirectoryCache>,
    ) -> Result<Self> {
        let extractor =
            StructuredExtractor::new(provider, prompts, &config.model, &config.site_origin)?
                .with_temperature(config.extraction_temperature);
        let enricher = PortfolioIdEnricher::new(fetcher.clone(), config.enrich_rate_per_minute);

        Ok(Self {
            fetcher,
            extractor,
            enricher,
            cache,
            listing_url: config.listing_url.clone(),
            output_path: config.investors_file.clone(),
            cache_ttl: config.cache_ttl,
            refresh: false,
        })
    }

    /// Skip the cache read and always rebuild
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Write the directory somewhere other than the configured file
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Where the directory file is written
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Produce the directory and write it to the output file
    ///
    /// A cache hit skips scraping and enrichment entirely. Any failure
    /// before the final write leaves the previous file untouched.
    #[instrument(skip(self), fields(listing = %self.listing_url, refresh = self.refresh))]
    pub async fn build(&self) -> Result<InvestorDirectory> {
        let cached = if self.refresh { None } else { self.cached().await? };
        if let Some(directory) = cached {
            info!(investors = directory.len(), "Using cached investor directory");
            write_directory(&self.output_path, &directory).await?;
            return Ok(directory);
        }

        let html = self
            .fetcher
            .fetch(&self.listing_url)
            .await
            .map_err(|e| InvestorError::Scrape(e.to_string()))?;
        let markdown = html_to_markdown(&html)?;
        debug!(html_len = html.len(), markdown_len = markdown.len(), "Converted listing page");

        let mut directory = self.extractor.extract(&markdown).await?;
        self.enricher.enrich(&mut directory).await?;

        self.store(&directory).await?;
        write_directory(&self.output_path, &directory).await?;
        info!(
            investors = directory.len(),
            path = %self.output_path.display(),
            "Investor directory built"
        );
        Ok(directory)
    }

    // SQLite calls block, so they run off the async worker threads
    async fn cached(&self) -> Result<Option<InvestorDirectory>> {
        let cache = self.cache.clone();
        tokio::task::spawn_blocking(move || cache.get())
            .await
            .map_err(|e| InvestorError::Cache(format!("Cache read task failed: {e}")))?
    }

    async fn store(&self, directory: &InvestorDirectory) -> Result<()> {
        let cache = self.cache.clone();
        let directory = directory.clone();
        let ttl = self.cache_ttl;
        tokio::task::spawn_blocking(move || cache.put(&directory, ttl))
            .await
            .map_err(|e| InvestorError::Cache(format!("Cache write task failed: {e}")))?
    }
}

/// Write `directory` as 4-space indented JSON, replacing `path` atomically
pub async fn write_directory(path: &Path, directory: &InvestorDirectory) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    directory.serialize(&mut serializer)?;
    buf.push(b'\n');

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &buf).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Read a directory previously written by [`write_directory`]
///
/// Blocking; meant for start-up before the agent serves requests.
pub fn load_directory(path: &Path) -> Result<InvestorDirectory> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| {
        InvestorError::Parse(format!("{} is not an investor directory: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::default_registry;
    use crate::scrape::fetcher::MockPageFetcher;
    use agent_llm::{CompletionRequest, CompletionResponse, Message, StopReason, TokenUsage};
    use async_trait::async_trait;
    use mockall::predicate::eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const LISTING: &str = "https://www.moneycontrol.com/india-investors-portfolio/";

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LLMProvider for CountingProvider {
        async fn complete(&self, _request: CompletionRequest) -> agent_llm::Result<CompletionResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = json!({
                "individual_investors": [{
                    "name": "Jane Doe",
                    "company_holdings": 5,
                    "net_worth": "1,200",
                    "url": "/india-investors-portfolio/jane-doe"
                }],
                "institutional_investors": [],
                "fii_investors": []
            });
            Ok(CompletionResponse {
                message: Message::assistant(reply.to_string()),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn config(dir: &Path) -> InvestorConfig {
        InvestorConfig::builder()
            .investors_file(dir.join("data").join("investors.json"))
            .cache_dir(dir.join("cache"))
            .build()
            .unwrap()
    }

    fn builder(
        config: &InvestorConfig,
        fetcher: MockPageFetcher,
        provider: Arc<CountingProvider>,
    ) -> DirectoryBuilder {
        let cache = Arc::new(DirectoryCache::open_in_memory().unwrap());
        DirectoryBuilder::new(
            config,
            Arc::new(fetcher),
            provider,
            default_registry().unwrap(),
            cache,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_second_build_within_ttl_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch()
            .with(eq(LISTING))
            .times(1)
            .returning(|_| Ok("<table><tr><td>Jane Doe</td><td>5</td></tr></table>".to_string()));
        fetcher
            .expect_fetch()
            .with(eq("https://www.moneycontrol.com/india-investors-portfolio/jane-doe"))
            .times(1)
            .returning(|_| Ok(r#"<input type="hidden" id="pid" value="584333">"#.to_string()));

        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let builder = builder(&config, fetcher, provider.clone());

        let first = builder.build().await.unwrap();
        let second = builder.build().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            first.individual_investors[0].portfolio_identifier.as_deref(),
            Some("584333")
        );

        let written = load_directory(&config.investors_file).unwrap();
        assert_eq!(written, first);
        let raw = std::fs::read_to_string(&config.investors_file).unwrap();
        assert!(raw.contains("\n    \"individual_investors\""));
        assert!(raw.contains("\"pid\": \"584333\""));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_refresh_rebuilds_then_cache_serves() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch()
            .with(eq(LISTING))
            .times(2)
            .returning(|_| Ok("<p>listing</p>".to_string()));
        fetcher
            .expect_fetch()
            .with(eq("https://www.moneycontrol.com/india-investors-portfolio/jane-doe"))
            .times(2)
            .returning(|_| Ok("<html>no pid here</html>".to_string()));

        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let refreshing = builder(&config, fetcher, provider.clone()).with_refresh(true);

        refreshing.build().await.unwrap();
        let rebuilt = refreshing.build().await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            rebuilt.individual_investors[0].portfolio_identifier.as_deref(),
            Some(crate::scrape::NO_PID)
        );

        let cached = refreshing.with_refresh(false).build().await.unwrap();
        assert_eq!(cached, rebuilt);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(load_directory(&config.investors_file).unwrap(), rebuilt);
    }

    #[tokio::test]
    async fn test_unreachable_listing_is_scrape_error_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let mut fetcher = MockPageFetcher::new();
        fetcher.expect_fetch().returning(|url| {
            Err(InvestorError::Fetch {
                url: url.to_string(),
                reason: "HTTP 500".to_string(),
            })
        });
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });

        let err = builder(&config, fetcher, provider.clone())
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, InvestorError::Scrape(msg) if msg.contains("HTTP 500")));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert!(!config.investors_file.exists());
    }

    #[tokio::test]
    async fn test_enrichment_failure_leaves_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let previous = InvestorDirectory::empty(chrono::Utc::now());
        write_directory(&config.investors_file, &previous).await.unwrap();

        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch()
            .with(eq(LISTING))
            .returning(|_| Ok("<p>listing</p>".to_string()));
        fetcher.expect_fetch().returning(|url| {
            Err(InvestorError::Fetch {
                url: url.to_string(),
                reason: "timed out".to_string(),
            })
        });
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });

        let err = builder(&config, fetcher, provider).build().await.unwrap_err();
        assert!(matches!(err, InvestorError::Enrichment { .. }));
        assert_eq!(load_directory(&config.investors_file).unwrap(), previous);
    }

    #[test]
    fn test_load_rejects_foreign_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("investors.json");
        std::fs::write(&path, r#"{"hello": "world"}"#).unwrap();
        assert!(matches!(load_directory(&path), Err(InvestorError::Parse(_))));
    }
}
