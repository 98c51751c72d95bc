use chrono::Utc;
use std::fs;
use tempfile::TempDir;

use wikivec_core::error::Error;
use wikivec_core::types::{Language, PageMeta, RunState, UrlHashCache};
use wikivec_vector::{FlatIndex, SnapshotStore};

fn meta(url: &str) -> PageMeta {
    PageMeta {
        url: url.to_string(),
        title: format!("Title of {url}"),
        snippet: format!("Snippet text for {url}"),
        language: Language::En,
        content_len: 42,
        fetched_at: Utc::now(),
    }
}

fn populated_state() -> (FlatIndex, UrlHashCache, RunState) {
    let mut index = FlatIndex::new(4);
    index
        .upsert(vec![1.0, 0.0, 0.0, 0.0], meta("https://w.example.com/a/"))
        .expect("upsert");
    index
        .upsert(vec![0.0, 1.0, 0.0, 0.0], meta("https://w.example.com/b/"))
        .expect("upsert");

    let mut hashes = UrlHashCache::new();
    hashes.insert("https://w.example.com/a/", "hash-a");
    hashes.insert("https://w.example.com/b/", "hash-b");

    let mut run_state = RunState::default();
    run_state.record_full(Utc::now(), 2);
    (index, hashes, run_state)
}

#[test]
fn save_then_load_round_trips_all_four_artifacts() {
    let tmp = TempDir::new().expect("tempdir");
    let store = SnapshotStore::new(tmp.path(), 2);
    let (index, hashes, run_state) = populated_state();

    store.save(&index, &hashes, &run_state).expect("save");
    let loaded = store.load().expect("load").expect("state present");

    assert_eq!(loaded.index.len(), index.len());
    assert_eq!(loaded.index.dim(), index.dim());
    assert_eq!(loaded.index.vectors(), index.vectors());
    assert_eq!(loaded.index.metadata(), index.metadata());
    assert_eq!(loaded.hashes, hashes);
    assert_eq!(loaded.run_state, run_state);
    assert_eq!(
        loaded.index.position_of("https://w.example.com/b/"),
        Some(1),
        "positions must be re-derived on load"
    );
}

#[test]
fn load_on_empty_root_is_none_not_an_error() {
    let tmp = TempDir::new().expect("tempdir");
    let store = SnapshotStore::new(tmp.path(), 2);
    assert!(store.load().expect("load").is_none());
}

#[test]
fn missing_artifact_is_corrupt_snapshot() {
    let tmp = TempDir::new().expect("tempdir");
    let store = SnapshotStore::new(tmp.path(), 2);
    let (index, hashes, run_state) = populated_state();
    store.save(&index, &hashes, &run_state).expect("save");

    // Delete the metadata store from the published generation.
    let current = fs::read_to_string(tmp.path().join("CURRENT")).expect("pointer");
    let gen_dir = tmp.path().join("snapshots").join(current.trim());
    fs::remove_file(gen_dir.join("metadata.json")).expect("remove");

    match store.load() {
        Err(Error::CorruptSnapshot(_)) => {}
        other => panic!("expected CorruptSnapshot, got ok={}", other.is_ok()),
    }
}

#[test]
fn diverging_store_lengths_are_corrupt() {
    let tmp = TempDir::new().expect("tempdir");
    let store = SnapshotStore::new(tmp.path(), 2);
    let (index, hashes, run_state) = populated_state();
    store.save(&index, &hashes, &run_state).expect("save");

    let current = fs::read_to_string(tmp.path().join("CURRENT")).expect("pointer");
    let gen_dir = tmp.path().join("snapshots").join(current.trim());
    // Drop one metadata entry so the parallel stores disagree.
    let metadata: Vec<PageMeta> =
        serde_json::from_slice(&fs::read(gen_dir.join("metadata.json")).expect("read"))
            .expect("parse");
    let shortened = &metadata[..1];
    fs::write(
        gen_dir.join("metadata.json"),
        serde_json::to_vec(&shortened).expect("serialize"),
    )
    .expect("write");

    match store.load() {
        Err(Error::CorruptSnapshot(_)) => {}
        other => panic!("expected CorruptSnapshot, got ok={}", other.is_ok()),
    }
}

#[test]
fn crash_before_pointer_swap_keeps_previous_snapshot() {
    let tmp = TempDir::new().expect("tempdir");
    let store = SnapshotStore::new(tmp.path(), 4);
    let (index, hashes, run_state) = populated_state();
    store.save(&index, &hashes, &run_state).expect("save");

    // Simulate a crash mid-save: a half-written generation directory
    // exists but CURRENT was never swapped.
    let orphan = tmp.path().join("snapshots").join("gen-9999999999999-000000");
    fs::create_dir_all(&orphan).expect("mkdir");
    fs::write(orphan.join("vectors.bin"), b"WV").expect("partial write");

    let loaded = store.load().expect("load").expect("previous state");
    assert_eq!(loaded.index.len(), 2, "old snapshot must remain loadable");
}

#[test]
fn second_save_supersedes_first_and_prunes_old_generations() {
    let tmp = TempDir::new().expect("tempdir");
    let store = SnapshotStore::new(tmp.path(), 1);
    let (mut index, hashes, run_state) = populated_state();
    store.save(&index, &hashes, &run_state).expect("save v1");

    index
        .upsert(vec![0.0, 0.0, 1.0, 0.0], meta("https://w.example.com/c/"))
        .expect("upsert");
    store.save(&index, &hashes, &run_state).expect("save v2");

    let loaded = store.load().expect("load").expect("state");
    assert_eq!(loaded.index.len(), 3);

    let generations = fs::read_dir(tmp.path().join("snapshots"))
        .expect("read_dir")
        .count();
    assert_eq!(generations, 1, "retention window of 1 keeps only CURRENT");
}
