//! Flat vector index over normalized vectors.
//!
//! Vectors and metadata live in two parallel arrays; position `i` in
//! one always corresponds to position `i` in the other. Every mutation
//! goes through `upsert`/`rebuild_from`, which keep the two arrays in
//! lockstep.

use std::collections::HashMap;

use wikivec_core::error::{Error, Result};
use wikivec_core::types::PageMeta;

pub struct FlatIndex {
    dim: usize,
    vectors: Vec<Vec<f32>>,
    metadata: Vec<PageMeta>,
    positions: HashMap<String, usize>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: Vec::new(),
            metadata: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Reassembles an index from persisted parts, re-deriving the
    /// url -> position map. Length or dimensionality disagreement is a
    /// corrupt snapshot, not a recoverable state.
    pub fn from_parts(dim: usize, vectors: Vec<Vec<f32>>, metadata: Vec<PageMeta>) -> Result<Self> {
        if vectors.len() != metadata.len() {
            return Err(Error::CorruptSnapshot(format!(
                "vector store has {} entries but metadata store has {}",
                vectors.len(),
                metadata.len()
            )));
        }
        for v in &vectors {
            if v.len() != dim {
                return Err(Error::CorruptSnapshot(format!(
                    "stored vector has dimension {} (index expects {})",
                    v.len(),
                    dim
                )));
            }
        }
        let mut positions = HashMap::with_capacity(metadata.len());
        for (pos, meta) in metadata.iter().enumerate() {
            positions.insert(meta.url.clone(), pos);
        }
        Ok(Self {
            dim,
            vectors,
            metadata,
            positions,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn position_of(&self, url: &str) -> Option<usize> {
        self.positions.get(url).copied()
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub fn metadata(&self) -> &[PageMeta] {
        &self.metadata
    }

    /// Appends a new entry, or overwrites vector and metadata in place
    /// when the URL already occupies a position. Either way both
    /// stores change at the same position, so the stale vector is
    /// unreachable the moment this returns.
    pub fn upsert(&mut self, vector: Vec<f32>, meta: PageMeta) -> Result<usize> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        match self.positions.get(&meta.url) {
            Some(&pos) => {
                self.vectors[pos] = vector;
                self.metadata[pos] = meta;
                Ok(pos)
            }
            None => {
                let pos = self.vectors.len();
                self.positions.insert(meta.url.clone(), pos);
                self.vectors.push(vector);
                self.metadata.push(meta);
                Ok(pos)
            }
        }
    }

    /// Top-k by inner product (cosine, given normalized vectors).
    /// Scores come back in non-increasing order; equal scores are
    /// ordered by ascending insertion position so results are
    /// reproducible.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(f32, PageMeta)>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }
        let mut scored: Vec<(f32, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(pos, v)| (dot(query, v), pos))
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, pos)| (score, self.metadata[pos].clone()))
            .collect())
    }

    /// Replaces the index contents entirely; used by full crawls and
    /// by recovery from a corrupt snapshot.
    pub fn rebuild_from(&mut self, entries: Vec<(Vec<f32>, PageMeta)>) -> Result<()> {
        self.clear();
        for (vector, meta) in entries {
            self.upsert(vector, meta)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.vectors.clear();
        self.metadata.clear();
        self.positions.clear();
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
