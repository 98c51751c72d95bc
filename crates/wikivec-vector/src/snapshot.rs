//! Snapshot persistence for the whole pipeline state.
//!
//! A snapshot is one generation directory holding five co-located
//! artifacts: the binary vector store, the parallel metadata store,
//! the URL hash cache, the run state, and a manifest recording the
//! expected counts. A `CURRENT` pointer file names the live
//! generation; it is replaced with a write-temp-then-rename swap, so a
//! crash mid-save leaves the previous generation intact and loadable.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wikivec_core::error::{Error, Result};
use wikivec_core::types::{PageMeta, RunState, UrlHashCache};

use crate::index::FlatIndex;

pub const VECTORS_FILE: &str = "vectors.bin";
pub const METADATA_FILE: &str = "metadata.json";
pub const HASHES_FILE: &str = "url_hashes.json";
pub const RUN_STATE_FILE: &str = "run_state.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const CURRENT_FILE: &str = "CURRENT";
pub const SNAPSHOTS_DIR: &str = "snapshots";

const VECTORS_MAGIC: &[u8; 4] = b"WVEC";
const VECTORS_VERSION: u32 = 1;
const MANIFEST_VERSION: u32 = 1;

static GENERATION_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    dim: usize,
    vector_count: usize,
    page_count: usize,
    created_at: DateTime<Utc>,
}

/// Everything a process needs to resume where the previous one left
/// off.
pub struct PipelineState {
    pub index: FlatIndex,
    pub hashes: UrlHashCache,
    pub run_state: RunState,
}

pub struct SnapshotStore {
    root: PathBuf,
    keep_generations: usize,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>, keep_generations: usize) -> Self {
        Self {
            root: root.into(),
            keep_generations: keep_generations.max(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes all artifacts into a fresh generation directory, then
    /// swaps the `CURRENT` pointer. Only the pointer swap publishes
    /// the new snapshot.
    pub fn save(
        &self,
        index: &FlatIndex,
        hashes: &UrlHashCache,
        run_state: &RunState,
    ) -> anyhow::Result<()> {
        let generation = next_generation_name();
        let dir = self.root.join(SNAPSHOTS_DIR).join(&generation);
        fs::create_dir_all(&dir)?;

        write_file(&dir.join(VECTORS_FILE), &encode_vectors(index))?;
        write_file(
            &dir.join(METADATA_FILE),
            &serde_json::to_vec_pretty(index.metadata())?,
        )?;
        write_file(&dir.join(HASHES_FILE), &serde_json::to_vec_pretty(hashes)?)?;
        write_file(
            &dir.join(RUN_STATE_FILE),
            &serde_json::to_vec_pretty(run_state)?,
        )?;
        let manifest = Manifest {
            version: MANIFEST_VERSION,
            dim: index.dim(),
            vector_count: index.len(),
            page_count: index.metadata().len(),
            created_at: Utc::now(),
        };
        write_file(
            &dir.join(MANIFEST_FILE),
            &serde_json::to_vec_pretty(&manifest)?,
        )?;

        self.swap_current(&generation)?;
        tracing::info!(
            generation = %generation,
            pages = index.len(),
            "snapshot saved"
        );
        self.prune(&generation);
        Ok(())
    }

    /// Loads the generation named by `CURRENT`. `Ok(None)` means no
    /// snapshot has ever been published; any inconsistency in a
    /// published snapshot is `CorruptSnapshot`, which callers treat as
    /// "fall back to full rebuild".
    pub fn load(&self) -> Result<Option<PipelineState>> {
        let current = self.root.join(CURRENT_FILE);
        if !current.exists() {
            return Ok(None);
        }
        let generation = fs::read_to_string(&current)
            .map_err(|e| Error::CorruptSnapshot(format!("unreadable CURRENT: {e}")))?;
        let dir = self.root.join(SNAPSHOTS_DIR).join(generation.trim());

        let manifest: Manifest = read_json(&dir.join(MANIFEST_FILE))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(Error::CorruptSnapshot(format!(
                "unsupported manifest version {}",
                manifest.version
            )));
        }

        let vectors = decode_vectors(
            &fs::read(dir.join(VECTORS_FILE))
                .map_err(|e| Error::CorruptSnapshot(format!("unreadable vector store: {e}")))?,
        )?;
        let metadata: Vec<PageMeta> = read_json(&dir.join(METADATA_FILE))?;
        let hashes: UrlHashCache = read_json(&dir.join(HASHES_FILE))?;
        let run_state: RunState = read_json(&dir.join(RUN_STATE_FILE))?;

        if vectors.len() != manifest.vector_count || metadata.len() != manifest.page_count {
            return Err(Error::CorruptSnapshot(format!(
                "manifest promises {} vectors / {} pages, found {} / {}",
                manifest.vector_count,
                manifest.page_count,
                vectors.len(),
                metadata.len()
            )));
        }

        let index = FlatIndex::from_parts(manifest.dim, vectors, metadata)?;
        Ok(Some(PipelineState {
            index,
            hashes,
            run_state,
        }))
    }

    fn swap_current(&self, generation: &str) -> anyhow::Result<()> {
        fs::create_dir_all(&self.root)?;
        let tmp = self.root.join(format!("{CURRENT_FILE}.tmp"));
        write_file(&tmp, generation.as_bytes())?;
        fs::rename(&tmp, self.root.join(CURRENT_FILE))?;
        Ok(())
    }

    /// Removes generations older than the retention window. Pruning is
    /// best effort; a failure never invalidates the snapshot just
    /// published.
    fn prune(&self, current: &str) {
        let snapshots = self.root.join(SNAPSHOTS_DIR);
        let Ok(entries) = fs::read_dir(&snapshots) else {
            return;
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        if names.len() <= self.keep_generations {
            return;
        }
        let cutoff = names.len() - self.keep_generations;
        for name in &names[..cutoff] {
            if name == current {
                continue;
            }
            if let Err(e) = fs::remove_dir_all(snapshots.join(name)) {
                tracing::warn!(generation = %name, "failed to prune old snapshot: {e}");
            }
        }
    }
}

/// Generation names are fixed-width so lexical order matches creation
/// order.
fn next_generation_name() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let seq = GENERATION_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("gen-{millis:013}-{seq:06}")
}

fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| {
        Error::CorruptSnapshot(format!("missing or unreadable {}: {e}", path.display()))
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::CorruptSnapshot(format!("invalid {}: {e}", path.display())))
}

/// Layout: magic "WVEC", version u32, dim u32, count u32, then
/// `count * dim` little-endian f32 values.
fn encode_vectors(index: &FlatIndex) -> Vec<u8> {
    let dim = index.dim();
    let count = index.len();
    let mut out = Vec::with_capacity(16 + count * dim * 4);
    out.extend_from_slice(VECTORS_MAGIC);
    out.extend_from_slice(&VECTORS_VERSION.to_le_bytes());
    out.extend_from_slice(&(dim as u32).to_le_bytes());
    out.extend_from_slice(&(count as u32).to_le_bytes());
    for vector in index.vectors() {
        for value in vector {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out
}

fn decode_vectors(bytes: &[u8]) -> Result<Vec<Vec<f32>>> {
    if bytes.len() < 16 || &bytes[0..4] != VECTORS_MAGIC {
        return Err(Error::CorruptSnapshot(
            "vector store header missing or wrong magic".to_string(),
        ));
    }
    let version = u32::from_le_bytes(slice4(bytes, 4)?);
    if version != VECTORS_VERSION {
        return Err(Error::CorruptSnapshot(format!(
            "unsupported vector store version {version}"
        )));
    }
    let dim = u32::from_le_bytes(slice4(bytes, 8)?) as usize;
    let count = u32::from_le_bytes(slice4(bytes, 12)?) as usize;
    // Header fields come straight off disk; a corrupt count/dim pair
    // must not overflow the size computation.
    let expected = count
        .checked_mul(dim)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(16))
        .ok_or_else(|| {
            Error::CorruptSnapshot(format!(
                "vector store header claims {count} x {dim} entries"
            ))
        })?;
    if bytes.len() != expected {
        return Err(Error::CorruptSnapshot(format!(
            "vector store is {} bytes, expected {expected}",
            bytes.len()
        )));
    }
    let mut vectors = Vec::with_capacity(count);
    let mut offset = 16;
    for _ in 0..count {
        let mut vector = Vec::with_capacity(dim);
        for _ in 0..dim {
            vector.push(f32::from_le_bytes(slice4(bytes, offset)?));
            offset += 4;
        }
        vectors.push(vector);
    }
    Ok(vectors)
}

fn slice4(bytes: &[u8], offset: usize) -> Result<[u8; 4]> {
    bytes
        .get(offset..offset + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| Error::CorruptSnapshot("vector store truncated".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wikivec_core::types::Language;

    fn sample_index() -> FlatIndex {
        let mut index = FlatIndex::new(3);
        for (i, url) in ["a", "b", "c"].iter().enumerate() {
            let mut v = vec![0.0f32; 3];
            v[i] = 1.0;
            index
                .upsert(
                    v,
                    PageMeta {
                        url: format!("https://wiki.example.com/{url}/"),
                        title: url.to_string(),
                        snippet: format!("page {url}"),
                        language: Language::En,
                        content_len: 6,
                        fetched_at: Utc::now(),
                    },
                )
                .expect("upsert");
        }
        index
    }

    #[test]
    fn vector_codec_round_trips() {
        let index = sample_index();
        let decoded = decode_vectors(&encode_vectors(&index)).expect("decode");
        assert_eq!(decoded, index.vectors());
    }

    #[test]
    fn vector_codec_rejects_overflowing_header_counts() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(VECTORS_MAGIC);
        bytes.extend_from_slice(&VECTORS_VERSION.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        match decode_vectors(&bytes) {
            Err(Error::CorruptSnapshot(_)) => {}
            other => panic!("expected CorruptSnapshot, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn vector_codec_rejects_truncation() {
        let index = sample_index();
        let mut bytes = encode_vectors(&index);
        bytes.truncate(bytes.len() - 3);
        match decode_vectors(&bytes) {
            Err(Error::CorruptSnapshot(_)) => {}
            other => panic!("expected CorruptSnapshot, got {:?}", other.is_ok()),
        }
    }
}
