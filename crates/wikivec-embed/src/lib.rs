//! Embedding clients: an HTTP client for an Ollama-style embedding
//! service and a deterministic hash-based embedder for offline runs
//! and tests.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use wikivec_core::config::EmbeddingConfig;
use wikivec_core::error::{Error, Result};
use wikivec_core::traits::Embedder;
use wikivec_core::types::Language;

/// Client for an embedding service speaking the Ollama
/// `/api/embeddings` protocol: `{model, prompt}` in, `{embedding}`
/// out. Vectors are L2-normalized before being returned so the index
/// can use inner-product similarity as cosine.
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dim: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            dim: cfg.dim,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str, _language: Language) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "model": self.model, "prompt": text }))
            .send()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::EmbeddingUnavailable(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(format!("bad response body: {e}")))?;

        if body.embedding.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: body.embedding.len(),
            });
        }

        Ok(normalize(body.embedding))
    }
}

/// Deterministic embedder used when `WIKIVEC_FAKE_EMBEDDINGS` is set
/// and throughout the test suite. Token hashes scatter weight across
/// the vector so distinct texts land on distinct directions.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str, _language: Language) -> Result<Vec<f32>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        Ok(normalize(v))
    }
}

/// Picks the fake embedder when `WIKIVEC_FAKE_EMBEDDINGS` is truthy,
/// otherwise the HTTP client configured in `cfg`.
pub fn default_embedder(cfg: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("WIKIVEC_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        tracing::info!(dim = cfg.dim, "using deterministic hash embedder");
        return Ok(Box::new(HashEmbedder::new(cfg.dim)));
    }
    Ok(Box::new(HttpEmbedder::new(cfg)?))
}

fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
    for x in &mut v {
        *x /= norm;
    }
    v
}
