//! Snapshot version store.
//!
//! Owns `.membank/history/`. Snapshot files are immutable and named
//! `<base>_v<version>.<ext>`, where `<base>` is the document's project-relative
//! stem with `/` flattened to `__`. The store keeps no index of its own; callers
//! pass version histories in.

use crate::models::version::{ChangeType, VersionMetadata};
use crate::utils::fs::write_atomic;
use crate::utils::hash::compute_hash;
use crate::{Error, Result};
use chrono::Utc;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Default number of snapshots retained per file.
pub const DEFAULT_KEEP_VERSIONS: usize = 10;

/// Everything needed to write one snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotRequest<'a> {
    /// Document path, relative to the project root.
    pub file_path: &'a str,
    pub version: u32,
    pub content: &'a str,
    pub size_bytes: u64,
    pub token_count: usize,
    /// Must equal the hash of `content`.
    pub content_hash: &'a str,
    pub change_type: ChangeType,
    pub changed_sections: Vec<String>,
    pub description: Option<String>,
    pub batch_id: Option<String>,
}

/// Content read back from a snapshot.
#[derive(Debug, Clone)]
pub struct RestoredVersion {
    pub content: String,
    pub metadata: VersionMetadata,
}

/// Snapshot directory usage.
#[derive(Debug, Clone, Default)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub snapshot_count: usize,
    /// Snapshot count per document base name.
    pub per_file: BTreeMap<String, usize>,
}

/// Snapshot file store.
pub struct VersionStore {
    project_root: PathBuf,
    history_dir: PathBuf,
    keep_versions: usize,
}

impl VersionStore {
    /// Create a version store for a project.
    pub fn new(project_root: impl Into<PathBuf>, keep_versions: usize) -> Self {
        let project_root = project_root.into();
        let history_dir = project_root.join(crate::APP_DIR).join("history");
        Self {
            project_root,
            history_dir,
            keep_versions,
        }
    }

    /// Snapshot directory.
    pub fn history_dir(&self) -> &Path {
        &self.history_dir
    }

    /// Number of snapshots retained per file.
    pub fn keep_versions(&self) -> usize {
        self.keep_versions
    }

    /// Snapshot file name for a document version.
    pub fn snapshot_file_name(file_path: &str, version: u32) -> String {
        let (base, ext) = snapshot_base(file_path);
        match ext {
            Some(ext) => format!("{}_v{}.{}", base, version, ext),
            None => format!("{}_v{}", base, version),
        }
    }

    /// Write a snapshot and return its metadata.
    pub async fn create_snapshot(&self, request: SnapshotRequest<'_>) -> Result<VersionMetadata> {
        let actual_hash = compute_hash(request.content);
        if actual_hash != request.content_hash {
            return Err(Error::SnapshotHashMismatch(request.file_path.to_string()));
        }

        let file_name = Self::snapshot_file_name(request.file_path, request.version);
        let path = self.history_dir.join(&file_name);
        if tokio::fs::try_exists(&path).await? {
            return Err(Error::other(format!(
                "Snapshot already exists: {}",
                path.display()
            )));
        }

        write_atomic(&path, request.content.as_bytes()).await?;
        tracing::debug!("Created snapshot {:?} ({:?})", path, request.change_type);

        Ok(VersionMetadata {
            version: request.version,
            timestamp: Utc::now().to_rfc3339(),
            content_hash: actual_hash,
            size_bytes: request.size_bytes,
            token_count: request.token_count,
            change_type: request.change_type,
            snapshot_path: format!("{}/history/{}", crate::APP_DIR, file_name),
            changed_sections: request.changed_sections,
            change_description: request.description.unwrap_or_default(),
            batch_id: request.batch_id,
        })
    }

    /// Read a snapshot file. Relative paths resolve against the project root.
    pub async fn get_snapshot_content(&self, snapshot_path: &str) -> Result<String> {
        let path = Path::new(snapshot_path);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::SnapshotNotFound(snapshot_path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read a snapshot and check it against its recorded hash.
    pub async fn read_verified(&self, metadata: &VersionMetadata) -> Result<String> {
        let content = self.get_snapshot_content(&metadata.snapshot_path).await?;
        let actual = compute_hash(&content);
        if actual != metadata.content_hash {
            return Err(Error::SnapshotCorrupted {
                path: metadata.snapshot_path.clone(),
                expected: metadata.content_hash.clone(),
                actual,
            });
        }
        Ok(content)
    }

    /// Find `target_version` in `history` and read its snapshot.
    pub async fn rollback_to_version(
        &self,
        history: &[VersionMetadata],
        target_version: u32,
    ) -> Result<Option<RestoredVersion>> {
        let Some(metadata) = history.iter().find(|v| v.version == target_version) else {
            return Ok(None);
        };

        let content = self.read_verified(metadata).await?;
        Ok(Some(RestoredVersion {
            content,
            metadata: metadata.clone(),
        }))
    }

    /// Snapshot versions on disk for a document, ascending.
    pub async fn list_versions(&self, file_name: &str) -> Result<Vec<(u32, PathBuf)>> {
        let (base, ext) = snapshot_base(file_name);
        let mut versions: Vec<(u32, PathBuf)> = self
            .scan()
            .await?
            .into_iter()
            .filter(|s| s.base == base && s.ext == ext)
            .map(|s| (s.version, s.path))
            .collect();
        versions.sort_by_key(|(version, _)| *version);
        Ok(versions)
    }

    /// Delete all but the newest `keep_versions` snapshots of a document.
    ///
    /// Returns the versions that were removed. Individual delete failures are
    /// logged and skipped.
    pub async fn prune_versions(&self, file_name: &str) -> Result<Vec<u32>> {
        self.prune_versions_except(file_name, &HashSet::new()).await
    }

    /// Like [`prune_versions`](Self::prune_versions), but never removes a
    /// version in `pinned`. Pinned versions still count toward the limit.
    pub async fn prune_versions_except(
        &self,
        file_name: &str,
        pinned: &HashSet<u32>,
    ) -> Result<Vec<u32>> {
        let versions = self.list_versions(file_name).await?;
        if versions.len() <= self.keep_versions {
            return Ok(Vec::new());
        }

        let excess = versions.len() - self.keep_versions;
        let mut removed = Vec::new();
        let candidates = versions
            .into_iter()
            .filter(|(version, _)| !pinned.contains(version))
            .take(excess);
        for (version, path) in candidates {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    tracing::debug!("Pruned snapshot {:?}", path);
                    removed.push(version);
                }
                Err(e) => tracing::warn!("Failed to prune snapshot {:?}: {}", path, e),
            }
        }
        Ok(removed)
    }

    /// Size and count of all snapshots.
    pub async fn get_disk_usage(&self) -> Result<DiskUsage> {
        let mut usage = DiskUsage::default();
        for snapshot in self.scan().await? {
            usage.total_bytes += snapshot.size;
            usage.snapshot_count += 1;
            *usage.per_file.entry(snapshot.base).or_insert(0) += 1;
        }
        Ok(usage)
    }

    /// Remove snapshots whose document is not in `valid_files`. Returns the count removed.
    pub async fn cleanup_orphaned_snapshots(&self, valid_files: &[String]) -> Result<usize> {
        let valid: HashSet<(String, Option<String>)> =
            valid_files.iter().map(|f| snapshot_base(f)).collect();

        let mut removed = 0;
        for snapshot in self.scan().await? {
            if valid.contains(&(snapshot.base.clone(), snapshot.ext.clone())) {
                continue;
            }
            match tokio::fs::remove_file(&snapshot.path).await {
                Ok(()) => {
                    tracing::info!("Removed orphaned snapshot {:?}", snapshot.path);
                    removed += 1;
                }
                Err(e) => tracing::warn!("Failed to remove {:?}: {}", snapshot.path, e),
            }
        }
        Ok(removed)
    }

    async fn scan(&self) -> Result<Vec<SnapshotFile>> {
        let mut entries = match tokio::fs::read_dir(&self.history_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let re = Regex::new(r"^(?P<base>.+)_v(?P<version>\d+)(?:\.(?P<ext>[^.]+))?$")
            .map_err(|e| Error::other(e.to_string()))?;

        let mut snapshots = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(caps) = re.captures(&name) else {
                continue;
            };
            let Ok(version) = caps["version"].parse::<u32>() else {
                continue;
            };
            snapshots.push(SnapshotFile {
                base: caps["base"].to_string(),
                ext: caps.name("ext").map(|m| m.as_str().to_string()),
                version,
                size: metadata.len(),
                path: entry.path(),
            });
        }
        Ok(snapshots)
    }
}

struct SnapshotFile {
    base: String,
    ext: Option<String>,
    version: u32,
    size: u64,
    path: PathBuf,
}

/// Split a document path into its flattened snapshot base and extension.
fn snapshot_base(file_path: &str) -> (String, Option<String>) {
    let normalized = file_path.replace('\\', "/");
    let (dir, file) = match normalized.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, normalized.as_str()),
    };
    let (stem, ext) = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext.to_string())),
        _ => (file, None),
    };
    let base = match dir {
        Some(dir) => format!("{}__{}", dir.replace('/', "__"), stem),
        None => stem.to_string(),
    };
    (base, ext)
}
