//! Tracked file metadata.

use super::version::VersionMetadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the memory bank last recorded about a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Hash of the content as last written through the memory bank.
    pub content_hash: String,
    pub size_bytes: u64,
    pub token_count: usize,
    /// Last tracked write (RFC 3339).
    pub last_modified: String,
    /// Set when the file was removed by a tracked operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    /// Snapshots of this file, oldest first.
    #[serde(default)]
    pub version_history: Vec<VersionMetadata>,
}

impl FileMetadata {
    /// Highest version number recorded for the file.
    pub fn latest_version(&self) -> u32 {
        self.version_history
            .iter()
            .map(|v| v.version)
            .max()
            .unwrap_or(0)
    }

    /// Most recent version belonging to a snapshot batch.
    pub fn batch_version(&self, snapshot_id: &str) -> Option<&VersionMetadata> {
        self.version_history
            .iter()
            .filter(|v| v.belongs_to_batch(snapshot_id))
            .max_by_key(|v| v.version)
    }
}

/// Metadata index file (`.membank/index.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexFile {
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub files: BTreeMap<String, FileMetadata>,
}
