//! The crawl driver: breadth-first traversal from the seed set,
//! change detection via content fingerprints, and per-URL error
//! aggregation into a `CrawlReport`.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use wikivec_core::config::CrawlConfig;
use wikivec_core::error::{Error, Result};
use wikivec_core::traits::{Embedder, PageFetcher};
use wikivec_core::types::{CrawlMode, CrawlReport, FetchedPage, PageMeta, UrlHashCache};
use wikivec_vector::FlatIndex;

use crate::frontier::Frontier;
use crate::hasher::fingerprint;
use crate::urls::UrlPolicy;

pub struct Crawler<'a> {
    fetcher: &'a dyn PageFetcher,
    embedder: &'a dyn Embedder,
    config: CrawlConfig,
}

impl<'a> Crawler<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, embedder: &'a dyn Embedder, config: CrawlConfig) -> Self {
        Self {
            fetcher,
            embedder,
            config,
        }
    }

    /// Runs one crawl pass. `Full` discards the hash cache and index
    /// before traversal; `Incremental` reuses the cache to skip
    /// unchanged pages without re-embedding.
    ///
    /// All per-URL failures are absorbed into the report; only
    /// configuration errors (bad base URL, no usable seeds) surface as
    /// `Err`. Cancellation is observed between URLs, never mid-fetch.
    pub async fn run(
        &self,
        mode: CrawlMode,
        index: &mut FlatIndex,
        hashes: &mut UrlHashCache,
        cancel: &watch::Receiver<bool>,
    ) -> Result<CrawlReport> {
        let policy = UrlPolicy::new(&self.config.base_url)?;
        let seeds = policy.seeds(&self.config.seed_paths);
        if seeds.is_empty() {
            return Err(Error::InvalidConfig(
                "no valid seed urls after normalization".to_string(),
            ));
        }

        if mode == CrawlMode::Full {
            tracing::info!("full crawl: discarding hash cache and index contents");
            index.clear();
            hashes.clear();
        }

        let mut frontier = Frontier::new(self.config.max_depth);
        for seed in &seeds {
            frontier.push(seed, 0);
        }

        let mut report = CrawlReport::default();
        let mut first = true;
        while let Some((url, depth)) = frontier.pop() {
            if *cancel.borrow() {
                tracing::info!(pending = frontier.pending(), "crawl cancelled between fetches");
                break;
            }
            if !first {
                tokio::time::sleep(Duration::from_millis(self.config.fetch_delay_ms)).await;
            }
            first = false;

            let page = match self.fetch_with_retries(&url).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(url, "fetch failed after retries: {e}");
                    report.failed += 1;
                    continue;
                }
            };

            if depth < self.config.max_depth {
                for link in &page.links {
                    frontier.push(link, depth + 1);
                }
            }

            let content_chars = page.text.chars().count();
            if content_chars < self.config.min_content_len {
                tracing::debug!(url, content_chars, "content too short, not indexed");
                continue;
            }

            let fp = fingerprint(&page.text);
            let cached = hashes.get(&url).map(str::to_string);
            match cached.as_deref() {
                Some(old) if old == fp => {
                    tracing::debug!(url, "unchanged, skipping re-embed");
                    report.unchanged += 1;
                }
                cached => {
                    let is_new = cached.is_none();
                    match self.index_page(&url, &page, index).await {
                        Ok(()) => {
                            hashes.insert(&url, &fp);
                            if is_new {
                                report.new_pages += 1;
                            } else {
                                report.updated += 1;
                            }
                        }
                        Err(e) => {
                            // Hash cache stays untouched so the page is
                            // retried on the next pass.
                            tracing::warn!(url, "indexing failed: {e}");
                            report.failed += 1;
                        }
                    }
                }
            }
        }

        report.discovered = frontier.discovered();
        tracing::info!(
            mode = mode.as_str(),
            discovered = report.discovered,
            new = report.new_pages,
            updated = report.updated,
            unchanged = report.unchanged,
            failed = report.failed,
            "crawl pass finished"
        );
        Ok(report)
    }

    async fn fetch_with_retries(&self, url: &str) -> Result<FetchedPage> {
        let mut attempt = 0u32;
        loop {
            match self.fetcher.fetch(url).await {
                Ok(page) => return Ok(page),
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::debug!(url, attempt, "retrying fetch: {e}");
                    tokio::time::sleep(Duration::from_millis(self.config.fetch_delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn index_page(&self, url: &str, page: &FetchedPage, index: &mut FlatIndex) -> Result<()> {
        let vector = self.embedder.embed(&page.text, page.language).await?;
        let meta = PageMeta {
            url: url.to_string(),
            title: page.title.clone(),
            snippet: page.text.clone(),
            language: page.language,
            content_len: page.text.chars().count(),
            fetched_at: Utc::now(),
        };
        index.upsert(vector, meta)?;
        Ok(())
    }
}
