//! Pipeline: owns the in-memory index, hash cache and run state,
//! drives crawl passes and snapshots, and hosts the daemon loop.

use std::time::Duration;

use tokio::sync::watch;

use wikivec_core::config::{expand_path, Settings};
use wikivec_core::traits::{Embedder, PageFetcher};
use wikivec_core::types::{CrawlMode, CrawlReport, Language, RunState, UrlHashCache};
use wikivec_crawler::Crawler;
use wikivec_vector::{FlatIndex, SnapshotStore};

use crate::clock::Clock;
use crate::schedule::{self, Trigger};

/// One row of the query surface handed to the QA client.
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub url: String,
    pub snippet: String,
    pub score: f32,
}

pub struct Pipeline {
    settings: Settings,
    fetcher: Box<dyn PageFetcher>,
    embedder: Box<dyn Embedder>,
    clock: Box<dyn Clock>,
    store: SnapshotStore,
    index: FlatIndex,
    hashes: UrlHashCache,
    run_state: RunState,
    save_pending: bool,
}

impl Pipeline {
    /// Loads the persisted snapshot if a usable one exists; a corrupt
    /// snapshot degrades to empty state (the next full pass rebuilds)
    /// and never aborts startup.
    pub fn new(
        settings: Settings,
        fetcher: Box<dyn PageFetcher>,
        embedder: Box<dyn Embedder>,
        clock: Box<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let store = SnapshotStore::new(
            expand_path(&settings.store.data_dir),
            settings.store.keep_generations,
        );
        let dim = embedder.dim();

        let (index, hashes, run_state) = match store.load() {
            Ok(Some(state)) if state.index.dim() == dim => {
                tracing::info!(pages = state.index.len(), "resumed from snapshot");
                (state.index, state.hashes, state.run_state)
            }
            Ok(Some(state)) => {
                tracing::warn!(
                    snapshot_dim = state.index.dim(),
                    configured_dim = dim,
                    "snapshot dimensionality differs from configuration, rebuilding"
                );
                (FlatIndex::new(dim), UrlHashCache::new(), RunState::default())
            }
            Ok(None) => {
                tracing::info!("no snapshot found, starting empty");
                (FlatIndex::new(dim), UrlHashCache::new(), RunState::default())
            }
            Err(e) => {
                tracing::warn!("snapshot unusable ({e}), falling back to full rebuild");
                (FlatIndex::new(dim), UrlHashCache::new(), RunState::default())
            }
        };

        Ok(Self {
            settings,
            fetcher,
            embedder,
            clock,
            store,
            index,
            hashes,
            run_state,
            save_pending: false,
        })
    }

    pub fn run_state(&self) -> &RunState {
        &self.run_state
    }

    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Runs a single crawl pass. A `full` pass without `force` is
    /// skipped while the last full refresh is still fresh; `force`
    /// always runs it.
    pub async fn run_once(
        &mut self,
        mode: CrawlMode,
        force: bool,
        cancel: &watch::Receiver<bool>,
    ) -> anyhow::Result<CrawlReport> {
        let now = self.clock.now();
        if mode == CrawlMode::Full
            && !force
            && !schedule::full_due(&self.run_state, now, &self.settings.schedule)
        {
            tracing::info!("full refresh still fresh, skipping (use force to override)");
            return Ok(CrawlReport::default());
        }

        let crawler = Crawler::new(
            self.fetcher.as_ref(),
            self.embedder.as_ref(),
            self.settings.crawl.clone(),
        );
        let report = crawler
            .run(mode, &mut self.index, &mut self.hashes, cancel)
            .await?;

        let now = self.clock.now();
        match mode {
            CrawlMode::Full => self.run_state.record_full(now, self.index.len()),
            CrawlMode::Incremental => self.run_state.record_incremental(now, self.index.len()),
        }

        if report.warrants_save() {
            self.save_pending = true;
            self.save();
        }
        Ok(report)
    }

    /// Embeds the query text and returns the k nearest pages.
    pub async fn query(&self, text: &str, k: usize) -> anyhow::Result<Vec<QueryHit>> {
        let vector = self.embedder.embed(text, Language::detect(text)).await?;
        let hits = self.index.search(&vector, k)?;
        Ok(hits
            .into_iter()
            .map(|(score, meta)| QueryHit {
                url: meta.url,
                snippet: meta.snippet,
                score,
            })
            .collect())
    }

    /// Timer-driven control loop: incremental checks on the short
    /// interval, full refreshes on the long one, snapshot after every
    /// save-worthy pass. A failed pass is logged and the schedule
    /// continues; only the stop signal ends the loop, and a pending
    /// save is flushed before returning.
    pub async fn run_forever(&mut self, mut stop: watch::Receiver<bool>) -> anyhow::Result<()> {
        tracing::info!(
            incremental_minutes = self.settings.schedule.incremental_minutes,
            full_hours = self.settings.schedule.full_hours,
            "daemon started"
        );
        loop {
            if *stop.borrow() {
                break;
            }
            let now = self.clock.now();
            if let Some(trigger) = schedule::due(&self.run_state, now, &self.settings.schedule) {
                let mode = match trigger {
                    Trigger::FullDue => CrawlMode::Full,
                    Trigger::IncrementalDue => CrawlMode::Incremental,
                };
                tracing::info!(mode = mode.as_str(), "scheduled crawl pass starting");
                match self.run_once(mode, false, &stop).await {
                    Ok(report) => tracing::info!(
                        new = report.new_pages,
                        updated = report.updated,
                        unchanged = report.unchanged,
                        failed = report.failed,
                        "scheduled pass finished"
                    ),
                    Err(e) => tracing::warn!("crawl pass failed, staying on schedule: {e}"),
                }
            }

            let tick = Duration::from_secs(self.settings.schedule.tick_secs);
            tokio::select! {
                _ = tokio::time::sleep(tick) => {}
                _ = stop.changed() => {}
            }
        }

        if self.save_pending {
            self.save();
        }
        tracing::info!("daemon terminated");
        Ok(())
    }

    /// Best-effort snapshot; on failure the pending flag stays set so
    /// the state is retried after the next pass or at shutdown.
    fn save(&mut self) {
        match self.store.save(&self.index, &self.hashes, &self.run_state) {
            Ok(()) => self.save_pending = false,
            Err(e) => tracing::warn!("snapshot save failed, will retry: {e}"),
        }
    }
}
