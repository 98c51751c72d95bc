//! Content fingerprinting for change detection.

/// Stable fingerprint of extracted page text. Same text always yields
/// the same digest across process restarts, so cached fingerprints
/// survive in the snapshot.
pub fn fingerprint(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}
