//! Metadata index of tracked documents.
//!
//! Stored as a single JSON document in `.membank/index.json`, loaded fully on
//! open and rewritten atomically on save.

use crate::models::metadata::{FileMetadata, IndexFile};
use crate::models::version::VersionMetadata;
use crate::utils::fs::{load_json_or_default, save_json_atomic};
use crate::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};

/// In-memory view of the metadata index.
pub struct MetadataIndex {
    path: PathBuf,
    data: IndexFile,
}

impl MetadataIndex {
    /// Load the index for a project, or start empty.
    pub async fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(crate::APP_DIR).join("index.json");
        let data = load_json_or_default(&path).await?;
        Ok(Self { path, data })
    }

    /// Persist the index.
    pub async fn save(&mut self) -> Result<()> {
        self.data.last_updated = Utc::now().to_rfc3339();
        save_json_atomic(&self.data, &self.path).await
    }

    /// Metadata for a file, if tracked.
    pub fn get_file_metadata(&self, name: &str) -> Option<&FileMetadata> {
        self.data.files.get(name)
    }

    /// All tracked file names.
    pub fn file_names(&self) -> Vec<String> {
        self.data.files.keys().cloned().collect()
    }

    /// Record a tracked write of a file.
    pub fn record_write(&mut self, name: &str, content_hash: &str, size_bytes: u64, token_count: usize) {
        let entry = self.data.files.entry(name.to_string()).or_default();
        entry.content_hash = content_hash.to_string();
        entry.size_bytes = size_bytes;
        entry.token_count = token_count;
        entry.last_modified = Utc::now().to_rfc3339();
        entry.deleted_at = None;
    }

    /// Append a version to a file's history.
    pub fn add_version_to_history(&mut self, name: &str, version: VersionMetadata) {
        self.data
            .files
            .entry(name.to_string())
            .or_default()
            .version_history
            .push(version);
    }

    /// Drop pruned versions from a file's history.
    pub fn remove_versions(&mut self, name: &str, versions: &[u32]) {
        if let Some(entry) = self.data.files.get_mut(name) {
            entry
                .version_history
                .retain(|v| !versions.contains(&v.version));
        }
    }

    /// Mark a file as removed by a tracked operation. History is kept.
    pub fn mark_deleted(&mut self, name: &str) {
        if let Some(entry) = self.data.files.get_mut(name) {
            entry.deleted_at = Some(Utc::now().to_rfc3339());
        }
    }
}
