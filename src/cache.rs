//! On-disk condensation cache: a JSON sidecar per chapter under
//! `<output_dir>/.cache/<chapter_filename>.json`.

use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content_hash: String,
    pub condensed_content: String,
    pub timestamp: String,
    pub original_length: usize,
    pub condensed_length: usize,
}

/// Hex-encoded MD5 of the raw input bytes; used as the cache key.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let digest = Md5::digest(bytes);
    format!("{digest:x}")
}

fn sidecar_path(output_dir: &Path, chapter_filename: &str) -> PathBuf {
    output_dir.join(".cache").join(format!("{chapter_filename}.json"))
}

/// Reads the sidecar for `chapter_filename`, if present and matching
/// `content_hash`. Missing or unparseable files are treated as cache misses,
/// never as errors — workers tolerate partially-written sidecars.
pub fn read_valid(output_dir: &Path, chapter_filename: &str, content_hash: &str) -> Option<CacheEntry> {
    let path = sidecar_path(output_dir, chapter_filename);
    let raw = std::fs::read_to_string(path).ok()?;
    let entry: CacheEntry = serde_json::from_str(&raw).ok()?;
    if entry.content_hash == content_hash {
        Some(entry)
    } else {
        None
    }
}

/// Writes (overwriting) the sidecar for `chapter_filename`.
pub fn write(output_dir: &Path, chapter_filename: &str, entry: &CacheEntry) -> Result<()> {
    let path = sidecar_path(output_dir, chapter_filename);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(entry)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn hash_is_stable_and_deterministic() {
        let a = hash_bytes(b"hello world");
        let b = hash_bytes(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn different_bytes_hash_differently() {
        assert_ne!(hash_bytes(b"one"), hash_bytes(b"two"));
    }

    #[test]
    fn write_then_read_valid_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let hash = hash_bytes(b"chapter one text");
        let entry = CacheEntry {
            content_hash: hash.clone(),
            condensed_content: "short version".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            original_length: 17,
            condensed_length: 13,
        };
        write(dir.path(), "ch1.txt", &entry).unwrap();

        let loaded = read_valid(dir.path(), "ch1.txt", &hash).unwrap();
        assert_eq!(loaded.condensed_content, "short version");
    }

    #[test]
    fn stale_hash_is_treated_as_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let entry = CacheEntry {
            content_hash: hash_bytes(b"old content"),
            condensed_content: "old".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            original_length: 11,
            condensed_length: 3,
        };
        write(dir.path(), "ch1.txt", &entry).unwrap();

        let lookup = read_valid(dir.path(), "ch1.txt", &hash_bytes(b"new content"));
        assert!(lookup.is_none());
    }

    #[test]
    fn missing_sidecar_is_a_miss_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_valid(dir.path(), "never-written.txt", "deadbeef").is_none());
    }
}
