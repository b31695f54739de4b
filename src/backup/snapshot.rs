//! Snapshot file format
//!
//! A snapshot is one JSON document: the plugin slug it belongs to, a
//! timestamp, every namespaced option and postmeta row, and a sha256
//! manifest of the plugin files archived alongside it. The slug is recorded
//! so a restore can refuse snapshots taken for a different plugin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::db::PostmetaRow;

/// One archived file, addressed relative to the plugin directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub sha256: String,
}

/// Point-in-time export of plugin-related state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Slug of the plugin this snapshot belongs to
    pub plugin_slug: String,

    pub created_at: DateTime<Utc>,

    /// Filename-safe timestamp shared with the files archive
    pub stamp: String,

    pub options: BTreeMap<String, String>,

    pub postmeta: Vec<PostmetaRow>,

    /// Manifest of the files archive; empty when no files were backed up
    #[serde(default)]
    pub files: Vec<ManifestEntry>,
}

impl Snapshot {
    pub fn new(
        plugin_slug: String,
        options: BTreeMap<String, String>,
        postmeta: Vec<PostmetaRow>,
    ) -> Self {
        let created_at = Utc::now();
        let stamp = created_at.format("%Y%m%d-%H%M%S").to_string();
        Self {
            plugin_slug,
            created_at,
            stamp,
            options,
            postmeta,
            files: Vec::new(),
        }
    }
}

/// Hex-encoded sha256 of a file's contents
pub fn file_sha256(path: &Path) -> std::io::Result<String> {
    let contents = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&contents);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_roundtrips_through_json() {
        let mut options = BTreeMap::new();
        options.insert(
            "webp_migrator_settings".to_string(),
            r#"{"quality":59}"#.to_string(),
        );
        let snapshot = Snapshot::new(
            "webp-safe-migrator".to_string(),
            options,
            vec![PostmetaRow {
                post_id: 7,
                meta_key: "_webp_migrator_status".to_string(),
                meta_value: "pending".to_string(),
            }],
        );

        let json = serde_json::to_string_pretty(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, back);
    }

    #[test]
    fn test_stamp_is_filename_safe() {
        let snapshot = Snapshot::new("p".to_string(), BTreeMap::new(), Vec::new());
        assert!(snapshot
            .stamp
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn test_file_sha256_is_stable() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"webp").unwrap();
        let first = file_sha256(&path).unwrap();
        let second = file_sha256(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }
}
