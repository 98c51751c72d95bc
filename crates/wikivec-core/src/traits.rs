use crate::error::Result;
use crate::types::{FetchedPage, Language};
use async_trait::async_trait;

/// Embedding service boundary: text in, fixed-length normalized
/// vector out. Unreachable service surfaces as
/// `Error::EmbeddingUnavailable`, which the crawler treats as a
/// per-URL failure.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    async fn embed(&self, text: &str, language: Language) -> Result<Vec<f32>>;
}

/// Page retrieval boundary. Implementations validate the URL, extract
/// the canonical content region and harvest outgoing links; failures
/// surface as `Error::FetchFailed`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}
