use thiserror::Error;

/// Closed error taxonomy for the crawl-and-index pipeline.
///
/// Per-URL failures (`FetchFailed`, `EmbeddingUnavailable`,
/// `DimensionMismatch`) are caught at the crawler boundary and folded
/// into the `CrawlReport`; `CorruptSnapshot` degrades to a full
/// rebuild; only `InvalidConfig` aborts a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

pub type Result<T> = std::result::Result<T, Error>;
