//! Domain types shared by the crawler, vector index and daemon.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed set of languages the wiki publishes in.
///
/// Extraction and labeling rules dispatch on this tag, never on raw
/// language strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Zh,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }

    /// Tags extracted text by comparing CJK ideograph count against
    /// ASCII letter count. English wins ties.
    pub fn detect(text: &str) -> Self {
        let mut cjk = 0usize;
        let mut ascii = 0usize;
        for ch in text.chars() {
            if ('\u{4e00}'..='\u{9fff}').contains(&ch) {
                cjk += 1;
            } else if ch.is_ascii_alphabetic() {
                ascii += 1;
            }
        }
        if cjk > ascii {
            Language::Zh
        } else {
            Language::En
        }
    }
}

/// Metadata stored at each index position, parallel to the vector at
/// the same position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageMeta {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub language: Language,
    pub content_len: usize,
    pub fetched_at: DateTime<Utc>,
}

/// Output of a page fetch: extracted content plus outgoing links that
/// already passed normalization and validation.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub title: String,
    pub text: String,
    pub language: Language,
    pub links: Vec<String>,
}

/// URL -> last-seen content fingerprint. Mutated only by the crawler
/// after a successful fetch+hash; persisted with every snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct UrlHashCache(HashMap<String, String>);

impl UrlHashCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<&str> {
        self.0.get(url).map(String::as_str)
    }

    pub fn insert(&mut self, url: &str, fingerprint: &str) {
        self.0.insert(url.to_string(), fingerprint.to_string());
    }

    pub fn contains(&self, url: &str) -> bool {
        self.0.contains_key(url)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Crawl mode selector. `Full` discards existing state and rebuilds;
/// `Incremental` reuses the hash cache to skip unchanged pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    Full,
    Incremental,
}

impl CrawlMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlMode::Full => "full",
            CrawlMode::Incremental => "incremental",
        }
    }
}

impl std::str::FromStr for CrawlMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(CrawlMode::Full),
            "incremental" => Ok(CrawlMode::Incremental),
            other => Err(format!("unknown crawl mode: {other}")),
        }
    }
}

/// Per-pass outcome counters, aggregated at the crawler boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub discovered: usize,
    pub new_pages: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl CrawlReport {
    /// A pass that inserted or replaced at least one vector leaves the
    /// in-memory state ahead of the last snapshot.
    pub fn warrants_save(&self) -> bool {
        self.new_pages + self.updated > 0
    }
}

/// Process-wide scheduling state, loaded from the snapshot at daemon
/// start and persisted after every save-worthy pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunState {
    pub last_full: Option<DateTime<Utc>>,
    pub last_incremental: Option<DateTime<Utc>>,
    pub total_pages: usize,
}

impl RunState {
    pub fn record_full(&mut self, now: DateTime<Utc>, total_pages: usize) {
        self.last_full = Some(now);
        self.last_incremental = Some(now);
        self.total_pages = total_pages;
    }

    pub fn record_incremental(&mut self, now: DateTime<Utc>, total_pages: usize) {
        self.last_incremental = Some(now);
        self.total_pages = total_pages;
    }
}
