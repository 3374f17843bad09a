//! Ingestion sources.
//!
//! A crawler yields a mixed batch of news items, indicator readings, and
//! calendar entries. Source failures are never fatal to the run: a broken
//! source is logged and skipped, the rest of the batch proceeds.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use marketpulse_common::CrawlItem;

#[async_trait]
pub trait Crawler: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<CrawlItem>>;
}

/// Fetch from every source, tolerating per-source failures.
pub async fn fetch_all(crawlers: &[Box<dyn Crawler>]) -> Vec<CrawlItem> {
    let mut items = Vec::new();
    for crawler in crawlers {
        match crawler.fetch().await {
            Ok(batch) => {
                info!(source = crawler.name(), count = batch.len(), "Fetched batch");
                items.extend(batch);
            }
            Err(e) => {
                warn!(source = crawler.name(), error = %e, "Source failed, skipping");
            }
        }
    }
    items
}

/// Reads a batch from a JSON file: an array of tagged crawl items. The
/// standard input path for scheduled runs fed by an external fetcher.
pub struct JsonFileCrawler {
    path: PathBuf,
}

impl JsonFileCrawler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Crawler for JsonFileCrawler {
    fn name(&self) -> &str {
        "json_file"
    }

    async fn fetch(&self) -> Result<Vec<CrawlItem>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading crawl batch {}", self.path.display()))?;
        let items: Vec<CrawlItem> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing crawl batch {}", self.path.display()))?;
        Ok(items)
    }
}
