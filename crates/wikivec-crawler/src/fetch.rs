//! HTTP page fetcher: retrieves a wiki page, extracts the canonical
//! content region and harvests outgoing links.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use wikivec_core::config::CrawlConfig;
use wikivec_core::error::{Error, Result};
use wikivec_core::traits::PageFetcher;
use wikivec_core::types::{FetchedPage, Language};

use crate::urls::UrlPolicy;

/// Content-region candidates in precedence order. The first selector
/// with a match wins; `body` is the fallback.
const REGION_SELECTORS: &[&str] = &[
    "main",
    "article",
    "div.theme-doc-markdown",
    "div.markdown",
    "div.content",
    "div.main",
    r#"div[role="main"]"#,
];

/// Per-language extraction rules, dispatched on the closed language
/// tag.
struct ExtractionRules {
    sentence_end: char,
    min_paragraph_chars: usize,
}

fn rules_for(language: Language) -> ExtractionRules {
    match language {
        Language::En => ExtractionRules {
            sentence_end: '.',
            min_paragraph_chars: 10,
        },
        Language::Zh => ExtractionRules {
            sentence_end: '。',
            min_paragraph_chars: 6,
        },
    }
}

pub struct HttpFetcher {
    client: reqwest::Client,
    policy: UrlPolicy,
    regions: Vec<Selector>,
    paragraphs: Selector,
    titles: Selector,
    anchors: Selector,
    body: Selector,
    max_snippet_len: usize,
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent("wikivec/0.1 (+incremental wiki indexer)")
            .build()
            .map_err(|e| Error::InvalidConfig(format!("http client: {e}")))?;
        let policy = UrlPolicy::new(&config.base_url)?;
        let regions = REGION_SELECTORS
            .iter()
            .map(|s| parse_selector(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            client,
            policy,
            regions,
            paragraphs: parse_selector("p, h1, h2, h3, h4, h5, h6")?,
            titles: parse_selector("title")?,
            anchors: parse_selector("a[href]")?,
            body: parse_selector("body")?,
            max_snippet_len: config.max_snippet_len,
        })
    }

    fn extract(&self, html: &str, page_url: &Url) -> (String, String, Vec<String>) {
        let document = Html::parse_document(html);

        let title = document
            .select(&self.titles)
            .next()
            .map(|el| collapse_ws(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "No Title".to_string());

        let region = self
            .regions
            .iter()
            .find_map(|sel| document.select(sel).next())
            .or_else(|| document.select(&self.body).next());

        let text = match region {
            Some(region) => self.region_text(region),
            None => String::new(),
        };

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for anchor in document.select(&self.anchors) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if let Some(url) = self.policy.accept(page_url, href) {
                if seen.insert(url.clone()) {
                    links.push(url);
                }
            }
        }

        (title, text, links)
    }

    /// First paragraphs and headings up to the snippet budget; falls
    /// back to the region's full text when the page has no paragraph
    /// structure or too little of it.
    fn region_text(&self, region: ElementRef<'_>) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut char_count = 0usize;
        for el in region.select(&self.paragraphs).take(8) {
            let text = collapse_ws(&el.text().collect::<String>());
            let rules = rules_for(Language::detect(&text));
            if text.chars().count() <= rules.min_paragraph_chars {
                continue;
            }
            char_count += text.chars().count();
            parts.push(text);
            if char_count >= self.max_snippet_len {
                break;
            }
        }
        let mut text = parts.join(" ");
        if text.chars().count() < 200 {
            let full = collapse_ws(&region.text().collect::<String>());
            if full.chars().count() > text.chars().count() {
                text = full;
            }
        }
        let language = Language::detect(&text);
        clip(&text, self.max_snippet_len, rules_for(language))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let parsed = Url::parse(url).map_err(|e| Error::FetchFailed {
            url: url.to_string(),
            reason: format!("unparsable url: {e}"),
        })?;
        if !self.policy.validate(&parsed) {
            return Err(Error::FetchFailed {
                url: url.to_string(),
                reason: "outside the target wiki".to_string(),
            });
        }

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| Error::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(Error::FetchFailed {
                url: url.to_string(),
                reason: format!("status {}", response.status()),
            });
        }
        let body = response.text().await.map_err(|e| Error::FetchFailed {
            url: url.to_string(),
            reason: format!("body read: {e}"),
        })?;

        let (title, text, links) = self.extract(&body, &parsed);
        let language = Language::detect(&text);
        tracing::debug!(url, %title, lang = language.as_str(), links = links.len(), "fetched page");
        Ok(FetchedPage {
            title,
            text,
            language,
            links,
        })
    }
}

fn parse_selector(source: &str) -> Result<Selector> {
    Selector::parse(source).map_err(|e| Error::InvalidConfig(format!("selector {source}: {e}")))
}

fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to the snippet budget on a char boundary, preferring the
/// last sentence end when one lands in the final quarter.
fn clip(text: &str, max_chars: usize, rules: ExtractionRules) -> String {
    let clipped: String = text.chars().take(max_chars).collect();
    if clipped.len() == text.len() {
        return clipped;
    }
    if let Some(byte_pos) = clipped.rfind(rules.sentence_end) {
        let end = byte_pos + rules.sentence_end.len_utf8();
        if clipped[..end].chars().count() >= max_chars * 3 / 4 {
            return clipped[..end].to_string();
        }
    }
    clipped
}
