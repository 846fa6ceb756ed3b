//! Hash-checked file access.
//!
//! Every write goes through [`FileStore::write_file`], which:
//! - serializes writers per file with a bounded wait
//! - rejects content with unresolved merge-conflict markers
//! - optionally checks the on-disk hash against the caller's expectation
//! - writes via temp file + rename

use crate::utils::fs::{normalize_relative, write_atomic};
use crate::utils::hash::compute_hash;
use crate::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// File access rooted at a project directory.
pub struct FileStore {
    root: PathBuf,
    lock_timeout: Duration,
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl FileStore {
    /// Create a file store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            lock_timeout,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a project-relative path to an absolute path.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let normalized = normalize_relative(relative)?;
        if normalized.is_empty() {
            return Err(Error::OutsideProject(relative.to_string()));
        }
        Ok(self.root.join(normalized))
    }

    /// Read a file, returning its content and hash.
    pub async fn read_file(&self, relative: &str) -> Result<(String, String)> {
        let path = self.resolve(relative)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let hash = compute_hash(&content);
                Ok((content, hash))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::PathNotFound(relative.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Current hash of a file, or `None` if it does not exist.
    pub async fn current_hash(&self, relative: &str) -> Result<Option<String>> {
        match self.read_file(relative).await {
            Ok((_, hash)) => Ok(Some(hash)),
            Err(Error::PathNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Check whether a path exists.
    pub async fn exists(&self, relative: &str) -> bool {
        match self.resolve(relative) {
            Ok(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Check whether a path is a directory.
    pub async fn is_dir(&self, relative: &str) -> bool {
        match self.resolve(relative) {
            Ok(path) => tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Write a file, returning the hash of the new content.
    ///
    /// When `expected_hash` is given the current on-disk hash must match it.
    pub async fn write_file(
        &self,
        relative: &str,
        content: &str,
        expected_hash: Option<&str>,
    ) -> Result<String> {
        let path = self.resolve(relative)?;
        let _guard = self.lock(&path, relative).await?;

        if has_conflict_markers(content) {
            return Err(Error::ConflictMarkers(relative.to_string()));
        }

        if let Some(expected) = expected_hash {
            let actual = match tokio::fs::read_to_string(&path).await {
                Ok(current) => compute_hash(&current),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => "<missing>".to_string(),
                Err(e) => return Err(e.into()),
            };
            if actual != expected {
                return Err(Error::Conflict {
                    path: relative.to_string(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        write_atomic(&path, content.as_bytes()).await?;
        tracing::debug!("Wrote {:?} ({} bytes)", path, content.len());
        Ok(compute_hash(content))
    }

    /// Rename a file or directory, creating destination parents.
    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.resolve(from)?;
        let to_path = self.resolve(to)?;
        if from_path == to_path {
            return Ok(());
        }
        let _from_guard = self.lock(&from_path, from).await?;
        let _to_guard = self.lock(&to_path, to).await?;

        crate::utils::fs::move_file(&from_path, &to_path).await?;
        tracing::debug!("Moved: {:?} -> {:?}", from_path, to_path);
        Ok(())
    }

    /// Remove a file.
    pub async fn remove_file(&self, relative: &str) -> Result<()> {
        let path = self.resolve(relative)?;
        let _guard = self.lock(&path, relative).await?;
        tokio::fs::remove_file(&path).await?;
        tracing::debug!("Deleted: {:?}", path);
        Ok(())
    }

    /// Remove a directory and everything in it.
    pub async fn remove_dir_all(&self, relative: &str) -> Result<()> {
        let path = self.resolve(relative)?;
        tokio::fs::remove_dir_all(&path).await?;
        tracing::debug!("Removed directory: {:?}", path);
        Ok(())
    }

    /// Remove a directory only if it is empty. Returns whether it was removed.
    pub async fn remove_dir_if_empty(&self, relative: &str) -> Result<bool> {
        let path = self.resolve(relative)?;
        let mut entries = match tokio::fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        if entries.next_entry().await?.is_some() {
            tracing::warn!("Directory not empty, skipping: {:?}", path);
            return Ok(false);
        }
        tokio::fs::remove_dir(&path).await?;
        tracing::debug!("Removed directory: {:?}", path);
        Ok(true)
    }

    /// Create a directory and all parent directories.
    pub async fn create_dir_all(&self, relative: &str) -> Result<()> {
        let path = self.resolve(relative)?;
        tokio::fs::create_dir_all(&path).await?;
        tracing::debug!("Created directory: {:?}", path);
        Ok(())
    }

    async fn lock(&self, path: &Path, relative: &str) -> Result<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Entries only the map still references are idle.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        tokio::time::timeout(self.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| Error::LockTimeout(relative.to_string()))
    }
}

/// Check for unresolved merge-conflict markers.
pub fn has_conflict_markers(content: &str) -> bool {
    let start = Regex::new(r"(?m)^<{7}(?: |$)");
    let end = Regex::new(r"(?m)^>{7}(?: |$)");
    match (start, end) {
        (Ok(start), Ok(end)) => start.is_match(content) && end.is_match(content),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> FileStore {
        FileStore::new(dir, Duration::from_millis(200))
    }

    #[test]
    fn test_has_conflict_markers() {
        assert!(has_conflict_markers(
            "a\n<<<<<<< HEAD\nmine\n=======\ntheirs\n>>>>>>> branch\n"
        ));
        assert!(!has_conflict_markers("Title\n=======\n\ntext\n"));
        assert!(!has_conflict_markers("<<<<<<< only start\n"));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::TempDir::new().unwrap();
        let files = store(dir.path());

        let hash = files.write_file("notes/a.md", "# A\n", None).await.unwrap();
        let (content, read_hash) = files.read_file("notes/a.md").await.unwrap();
        assert_eq!(content, "# A\n");
        assert_eq!(hash, read_hash);
    }

    #[tokio::test]
    async fn test_write_rejects_stale_hash() {
        let dir = tempfile::TempDir::new().unwrap();
        let files = store(dir.path());

        let first = files.write_file("a.md", "one", None).await.unwrap();
        files.write_file("a.md", "two", Some(&first)).await.unwrap();

        let err = files.write_file("a.md", "three", Some(&first)).await.unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        assert_eq!(files.read_file("a.md").await.unwrap().0, "two");
    }

    #[tokio::test]
    async fn test_write_rejects_conflict_markers() {
        let dir = tempfile::TempDir::new().unwrap();
        let files = store(dir.path());

        let err = files
            .write_file("a.md", "<<<<<<< HEAD\nx\n=======\ny\n>>>>>>> b\n", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConflictMarkers(_)));
    }

    #[tokio::test]
    async fn test_lock_timeout() {
        let dir = tempfile::TempDir::new().unwrap();
        let files = store(dir.path());
        let path = files.resolve("a.md").unwrap();

        let _held = files.lock(&path, "a.md").await.unwrap();
        let err = files.write_file("a.md", "x", None).await.unwrap_err();
        assert!(matches!(err, Error::LockTimeout(_)));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let files = store(dir.path());
        assert!(matches!(
            files.read_file("missing.md").await,
            Err(Error::PathNotFound(_))
        ));
        assert_eq!(files.current_hash("missing.md").await.unwrap(), None);
        assert!(files.resolve("../escape.md").is_err());
    }

    #[tokio::test]
    async fn test_idle_locks_are_dropped() {
        let dir = tempfile::TempDir::new().unwrap();
        let files = store(dir.path());

        for name in ["a.md", "b.md", "c.md"] {
            files.write_file(name, "# Doc\n", None).await.unwrap();
        }

        assert_eq!(files.locks.lock().unwrap().len(), 1);
    }
}
