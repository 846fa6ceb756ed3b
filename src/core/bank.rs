//! Tracked memory bank documents.
//!
//! Ties the file store, metadata index and version store together so that
//! every content-changing write records a new immutable snapshot.

use crate::core::versions::{SnapshotRequest, VersionStore};
use crate::models::config::Config;
use crate::models::metadata::FileMetadata;
use crate::models::version::{ChangeType, VersionMetadata};
use crate::services::file_store::FileStore;
use crate::services::metadata_index::MetadataIndex;
use crate::services::sections::changed_sections;
use crate::services::tokens::estimate_tokens;
use crate::utils::fs::list_documents;
use crate::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// A memory bank rooted at a project directory.
pub struct MemoryBank {
    root: PathBuf,
    config: Config,
    files: FileStore,
    versions: VersionStore,
    index: Mutex<MetadataIndex>,
}

impl MemoryBank {
    /// Open a memory bank, loading its metadata index.
    pub async fn open(root: impl Into<PathBuf>, config: Config) -> Result<Arc<Self>> {
        let root = root.into();
        crate::utils::fs::ensure_directory(&root)?;

        let files = FileStore::new(&root, Duration::from_millis(config.lock_timeout_ms));
        let versions = VersionStore::new(&root, config.keep_versions);
        let index = MetadataIndex::load(&root).await?;

        tracing::debug!("Opened memory bank at {:?}", root);
        Ok(Arc::new(Self {
            root,
            config,
            files,
            versions,
            index: Mutex::new(index),
        }))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn files(&self) -> &FileStore {
        &self.files
    }

    pub fn versions(&self) -> &VersionStore {
        &self.versions
    }

    /// Documents currently on disk, relative to the root.
    pub fn list_documents(&self) -> Vec<String> {
        list_documents(&self.root)
    }

    /// Metadata recorded for a file.
    pub async fn file_metadata(&self, name: &str) -> Option<FileMetadata> {
        self.index.lock().await.get_file_metadata(name).cloned()
    }

    /// Names of all tracked files, including ones removed by tracked operations.
    pub async fn tracked_files(&self) -> Vec<String> {
        self.index.lock().await.file_names()
    }

    /// Write a document through the hash-checked path and record a snapshot.
    ///
    /// Returns the hash of the new content.
    pub async fn write_document(
        &self,
        name: &str,
        content: &str,
        expected_hash: Option<&str>,
    ) -> Result<String> {
        let previous = match self.files.read_file(name).await {
            Ok((text, hash)) => Some((text, hash)),
            Err(Error::PathNotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let new_hash = self.files.write_file(name, content, expected_hash).await?;

        let mut index = self.index.lock().await;
        index.record_write(name, &new_hash, content.len() as u64, estimate_tokens(content));

        let unchanged = previous
            .as_ref()
            .map(|(_, hash)| *hash == new_hash)
            .unwrap_or(false);
        if !unchanged {
            let (change_type, sections) = match &previous {
                Some((text, _)) => (ChangeType::Modified, changed_sections(text, content)),
                None => (ChangeType::Created, changed_sections("", content)),
            };
            let version = self.next_version(&index, name).await?;
            let metadata = self
                .versions
                .create_snapshot(SnapshotRequest {
                    file_path: name,
                    version,
                    content,
                    size_bytes: content.len() as u64,
                    token_count: estimate_tokens(content),
                    content_hash: &new_hash,
                    change_type,
                    changed_sections: sections,
                    description: None,
                    batch_id: None,
                })
                .await?;
            index.add_version_to_history(name, metadata);
            self.prune_locked(&mut index, name).await?;
        }

        index.save().await?;
        Ok(new_hash)
    }

    /// Snapshot a file's current content without changing it.
    ///
    /// Untracked files start being tracked with their current content.
    pub async fn snapshot_file(
        &self,
        name: &str,
        change_type: ChangeType,
        description: Option<String>,
        batch_id: Option<String>,
    ) -> Result<VersionMetadata> {
        let (content, hash) = self.files.read_file(name).await?;
        let tokens = estimate_tokens(&content);

        let mut index = self.index.lock().await;
        if index.get_file_metadata(name).is_none() {
            index.record_write(name, &hash, content.len() as u64, tokens);
        }

        let version = self.next_version(&index, name).await?;
        let metadata = self
            .versions
            .create_snapshot(SnapshotRequest {
                file_path: name,
                version,
                content: &content,
                size_bytes: content.len() as u64,
                token_count: tokens,
                content_hash: &hash,
                change_type,
                changed_sections: Vec::new(),
                description,
                batch_id,
            })
            .await?;
        index.add_version_to_history(name, metadata.clone());
        self.prune_locked(&mut index, name).await?;
        index.save().await?;

        Ok(metadata)
    }

    /// Overwrite a file with the content of one of its versions.
    ///
    /// Records the result as a new `rollback` version.
    pub async fn restore_version(&self, name: &str, target: &VersionMetadata) -> Result<VersionMetadata> {
        let mut index = self.index.lock().await;
        let history = index
            .get_file_metadata(name)
            .map(|m| m.version_history.clone())
            .unwrap_or_default();

        let restored = self
            .versions
            .rollback_to_version(&history, target.version)
            .await?
            .ok_or_else(|| Error::SnapshotNotFound(target.snapshot_path.clone()))?;

        let content = restored.content;
        let new_hash = self.files.write_file(name, &content, None).await?;
        let tokens = estimate_tokens(&content);
        index.record_write(name, &new_hash, content.len() as u64, tokens);

        let version = self.next_version(&index, name).await?;
        let metadata = self
            .versions
            .create_snapshot(SnapshotRequest {
                file_path: name,
                version,
                content: &content,
                size_bytes: content.len() as u64,
                token_count: tokens,
                content_hash: &new_hash,
                change_type: ChangeType::Rollback,
                changed_sections: Vec::new(),
                description: Some(format!("Rolled back to version {}", target.version)),
                batch_id: None,
            })
            .await?;
        index.add_version_to_history(name, metadata.clone());
        self.prune_locked(&mut index, name).await?;
        index.save().await?;

        tracing::debug!("Restored {} to version {}", name, target.version);
        Ok(metadata)
    }

    /// Delete a tracked file and mark it removed in the index.
    pub async fn remove_document(&self, name: &str) -> Result<()> {
        self.files.remove_file(name).await?;
        let mut index = self.index.lock().await;
        index.mark_deleted(name);
        index.save().await
    }

    /// Record that files were removed by a tracked operation.
    pub async fn record_removed(&self, names: &[String]) -> Result<()> {
        let mut index = self.index.lock().await;
        for name in names {
            index.mark_deleted(name);
        }
        index.save().await
    }

    /// Record that a file moved from `from` to `to` through a tracked operation.
    pub async fn record_moved(&self, from: &str, to: &str) -> Result<()> {
        let (content, hash) = self.files.read_file(to).await?;
        let mut index = self.index.lock().await;
        index.record_write(to, &hash, content.len() as u64, estimate_tokens(&content));
        index.mark_deleted(from);
        index.save().await
    }

    /// Prune a file's snapshots down to the retention limit.
    pub async fn prune(&self, name: &str) -> Result<Vec<u32>> {
        let mut index = self.index.lock().await;
        let removed = self.prune_locked(&mut index, name).await?;
        index.save().await?;
        Ok(removed)
    }

    /// Remove snapshots of documents that no longer exist.
    pub async fn cleanup_orphaned_snapshots(&self) -> Result<usize> {
        let documents = self.list_documents();
        self.versions.cleanup_orphaned_snapshots(&documents).await
    }

    /// Pre-refactoring snapshots are pinned: rollback depends on them.
    async fn prune_locked(&self, index: &mut MetadataIndex, name: &str) -> Result<Vec<u32>> {
        let pinned: HashSet<u32> = index
            .get_file_metadata(name)
            .map(|m| {
                m.version_history
                    .iter()
                    .filter(|v| v.is_batch_snapshot())
                    .map(|v| v.version)
                    .collect()
            })
            .unwrap_or_default();
        let removed = self.versions.prune_versions_except(name, &pinned).await?;
        if !removed.is_empty() {
            tracing::debug!("Pruned {} snapshot(s) of {}", removed.len(), name);
            index.remove_versions(name, &removed);
        }
        Ok(removed)
    }

    async fn next_version(&self, index: &MetadataIndex, name: &str) -> Result<u32> {
        let tracked = index
            .get_file_metadata(name)
            .map(|m| m.latest_version())
            .unwrap_or(0);
        let on_disk = self
            .versions
            .list_versions(name)
            .await?
            .last()
            .map(|(version, _)| *version)
            .unwrap_or(0);
        Ok(tracked.max(on_disk) + 1)
    }
}
